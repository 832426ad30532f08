// NOTE: Playback is fixed to 16-bit signed little-endian PCM. Sources in any
// other sample format are rejected when opened rather than converted.

/// Shape of an interleaved PCM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

impl StreamSpec {
    pub const BITS_PER_SAMPLE: u16 = 16;

    /// Number of interleaved samples in `frames` frames
    pub fn samples_for_frames(&self, frames: usize) -> usize {
        frames * usize::from(self.channels)
    }
}

/// Parameters for opening a playback device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkParams {
    pub spec: StreamSpec,
    /// Frames per period. Lower values cut latency, higher values reduce
    /// the risk of underruns.
    pub period_frames: usize,
}

impl SinkParams {
    pub const DEFAULT_PERIOD_FRAMES: usize = 320;

    pub fn period_samples(&self) -> usize {
        self.spec.samples_for_frames(self.period_frames)
    }
}
