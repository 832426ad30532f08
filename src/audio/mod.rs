pub mod cpal_sink;
pub mod format;
pub mod sink;
pub mod source;
pub mod wav_source;

pub use format::{SinkParams, StreamSpec};
pub use sink::{AudioSink, Mixer};
pub use source::{AudioBackend, AudioSource};

use cpal_sink::CpalSink;
use wav_source::WavSource;

use anyhow::Result;
use std::path::Path;

/// WAV files played through a cpal output device
pub struct DeviceBackend {
    output_device: Option<String>,
}

impl DeviceBackend {
    pub fn new(output_device: Option<String>) -> Self {
        Self { output_device }
    }
}

impl AudioBackend for DeviceBackend {
    fn open_source(&self, path: &Path) -> Result<Box<dyn AudioSource>> {
        Ok(Box::new(WavSource::open(path)?))
    }

    fn open_sink(&self, params: &SinkParams) -> Result<Box<dyn AudioSink>> {
        Ok(Box::new(CpalSink::open(self.output_device.as_deref(), params)?))
    }
}
