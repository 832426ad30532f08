use std::path::PathBuf;
use thiserror::Error;

/// Errors that cross the controller boundary.
///
/// Hardware variants never reach callers of the controllers; the owning
/// worker logs them and stops. Only `InvalidCommand` and `NotPlaying` are
/// returned synchronously.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("failed to open audio source {path:?}: {cause:#}")]
    SourceOpen {
        path: PathBuf,
        cause: anyhow::Error,
    },
    #[error("failed to read audio source: {0:#}")]
    SourceRead(anyhow::Error),
    #[error("failed to open playback device: {0:#}")]
    DeviceOpen(anyhow::Error),
    #[error("playback device rejected write: {0:#}")]
    DeviceWrite(anyhow::Error),
    #[error("led strip failure: {0:#}")]
    StripWrite(anyhow::Error),
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    #[error("not playing")]
    NotPlaying,
}

impl ControlError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidCommand(reason.into())
    }
}
