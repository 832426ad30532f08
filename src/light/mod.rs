pub mod strip;
#[cfg(target_os = "linux")]
pub mod ws2812;

pub use strip::{LedStrip, LogStripBackend, StripBackend};
#[cfg(target_os = "linux")]
pub use ws2812::SpiStripBackend;
