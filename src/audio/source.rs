use super::format::{SinkParams, StreamSpec};
use super::sink::AudioSink;
use anyhow::Result;
use std::path::Path;

/// Readable, rewindable PCM source. Dropping it closes the underlying file.
pub trait AudioSource {
    fn spec(&self) -> StreamSpec;

    /// Replace `buf` with up to `frames` interleaved frames.
    /// Returns the number of frames read; 0 means the source is exhausted.
    fn read_frames(&mut self, frames: usize, buf: &mut Vec<i16>) -> Result<usize>;

    /// Seek back to frame 0
    fn rewind(&mut self) -> Result<()>;
}

/// Opens sources and playback devices for the audio worker.
///
/// Handles are opened on the worker thread and never leave it, so they do
/// not need to be `Send`.
pub trait AudioBackend: Send + Sync {
    fn open_source(&self, path: &Path) -> Result<Box<dyn AudioSource>>;

    fn open_sink(&self, params: &SinkParams) -> Result<Box<dyn AudioSink>>;
}
