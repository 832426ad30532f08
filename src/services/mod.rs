pub mod alarm;
pub mod audio;
pub mod light;
pub mod worker;

pub use alarm::{AlarmRequest, AlarmSequencer};
pub use audio::AudioController;
pub use light::LightController;
