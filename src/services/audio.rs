use super::worker::{Worker, WorkerShared};
use crate::audio::{AudioBackend, AudioSink, AudioSource, Mixer, SinkParams};
use crate::error::ControlError;
use crate::messages::{AudioCommand, Volume};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// Mixer of the device currently playing, if any
type MixerSlot = Arc<Mutex<Option<Arc<dyn Mixer>>>>;

/// Plays one looping track at a time on a dedicated worker thread.
///
/// Track changes go through the coalescing mailbox; volume changes bypass it
/// and hit the live mixer directly so they apply without restarting the
/// track.
pub struct AudioController {
    worker: Worker<AudioCommand>,
    backend: Arc<dyn AudioBackend>,
    mixer: MixerSlot,
    period_frames: usize,
}

impl AudioController {
    pub fn new(backend: Arc<dyn AudioBackend>, period_frames: usize) -> Self {
        Self {
            worker: Worker::new("audio"),
            backend,
            mixer: Arc::new(Mutex::new(None)),
            period_frames,
        }
    }

    pub fn start(&self) {
        let backend = self.backend.clone();
        let mixer = self.mixer.clone();
        let period_frames = self.period_frames;
        self.worker
            .start(move |shared| run(shared, backend.as_ref(), &mixer, period_frames));
    }

    /// Queue a track; replaces any track not yet picked up by the worker
    pub fn update_music(&self, source: PathBuf, volume: Volume) {
        tracing::debug!("Audio update: {:?} at {}", source, volume);
        self.worker.post(AudioCommand { source, volume });
    }

    pub fn set_volume(&self, volume: Volume) -> Result<(), ControlError> {
        let Some(mixer) = self.mixer.lock().clone() else {
            return Err(ControlError::NotPlaying);
        };

        let previous = mixer.volume();
        match mixer.set_volume(volume) {
            Ok(()) => tracing::info!("Volume adjusted from {} to {}", previous, volume),
            Err(e) => tracing::warn!("Failed to set volume to {}: {}", volume, e),
        }
        Ok(())
    }

    /// Stop playback; the device and source are closed when this returns
    pub fn stop(&self) {
        if self.worker.stop() {
            tracing::info!("Audio stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }
}

fn run(
    shared: &WorkerShared<AudioCommand>,
    backend: &dyn AudioBackend,
    mixer: &MixerSlot,
    period_frames: usize,
) -> Result<(), ControlError> {
    while let Some(command) = shared.next_command() {
        if !shared.is_running() {
            tracing::debug!("Discarding {:?}: audio controller stopping", command.source);
            break;
        }
        play(shared, backend, mixer, period_frames, command)?;
    }
    Ok(())
}

/// Open, loop until stopped or superseded, then close in reverse order
fn play(
    shared: &WorkerShared<AudioCommand>,
    backend: &dyn AudioBackend,
    mixer: &MixerSlot,
    period_frames: usize,
    command: AudioCommand,
) -> Result<(), ControlError> {
    tracing::info!("Playing {:?} at {}", command.source, command.volume);

    let mut source = shared.fatal(backend.open_source(&command.source).map_err(|cause| {
        ControlError::SourceOpen {
            path: command.source.clone(),
            cause,
        }
    }))?;
    let params = SinkParams {
        spec: source.spec(),
        period_frames,
    };
    let mut sink = shared.fatal(backend.open_sink(&params).map_err(ControlError::DeviceOpen))?;

    let device_mixer = sink.mixer();
    if let Err(e) = device_mixer.set_volume(command.volume) {
        tracing::warn!("Failed to apply volume {}: {}", command.volume, e);
    }
    *mixer.lock() = Some(device_mixer);

    let result = shared.fatal(stream(shared, source.as_mut(), sink.as_mut(), &params));

    mixer.lock().take();
    drop(sink);
    drop(source);
    tracing::debug!("Released {:?}", command.source);

    result
}

/// Write periods until the controller stops or a new track is posted.
/// An exhausted source is rewound so the track repeats without a gap.
fn stream(
    shared: &WorkerShared<AudioCommand>,
    source: &mut dyn AudioSource,
    sink: &mut dyn AudioSink,
    params: &SinkParams,
) -> Result<(), ControlError> {
    let mut buf = Vec::with_capacity(params.period_samples());

    while shared.is_running() && !shared.mailbox.has_pending() {
        let frames = source
            .read_frames(params.period_frames, &mut buf)
            .map_err(ControlError::SourceRead)?;

        if frames == 0 {
            source.rewind().map_err(ControlError::SourceRead)?;
            let frames = source
                .read_frames(params.period_frames, &mut buf)
                .map_err(ControlError::SourceRead)?;
            if frames == 0 {
                return Err(ControlError::SourceRead(anyhow::anyhow!(
                    "source contains no frames"
                )));
            }
        }

        sink.write(&buf).map_err(ControlError::DeviceWrite)?;
    }

    Ok(())
}
