use crate::messages::Volume;
use anyhow::Result;
use std::sync::Arc;

/// Playback device. Dropping it closes the device.
pub trait AudioSink {
    /// Write interleaved samples, blocking until the device accepted them
    fn write(&mut self, samples: &[i16]) -> Result<()>;

    /// Volume control for this device, usable from any thread
    fn mixer(&self) -> Arc<dyn Mixer>;
}

pub trait Mixer: Send + Sync {
    fn set_volume(&self, volume: Volume) -> Result<()>;

    fn volume(&self) -> Volume;
}
