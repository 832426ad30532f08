use crate::error::ControlError;
use crate::messages::{Rgb, TrackKind, Transition, Volume};
use crate::services::{AlarmRequest, AlarmSequencer, AudioController, LightController};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Writable command surfaces exposed to the remote client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Light,
    AudioOn,
    Volume,
    AudioOff,
    AlarmOn,
    AlarmOff,
}

impl FromStr for Surface {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Surface::Light),
            "audio-on" => Ok(Surface::AudioOn),
            "volume" => Ok(Surface::Volume),
            "audio-off" => Ok(Surface::AudioOff),
            "alarm-on" => Ok(Surface::AlarmOn),
            "alarm-off" => Ok(Surface::AlarmOff),
            other => Err(ControlError::invalid(format!("unknown surface {other:?}"))),
        }
    }
}

/// A validated command, ready to dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    LightOn(Rgb),
    LightOff,
    AudioOn { source: PathBuf, volume: Volume },
    SetVolume(Volume),
    AudioOff,
    AlarmOn(AlarmRequest),
    AlarmOff,
}

impl Command {
    /// Commands that hold the dispatching thread for a long time
    pub fn blocks_caller(&self) -> bool {
        matches!(self, Command::AlarmOn(_))
    }
}

/// Where `music` and `alarm` track ids live on disk
#[derive(Debug, Clone)]
pub struct TrackLibrary {
    music_dir: PathBuf,
    alarm_dir: PathBuf,
}

impl TrackLibrary {
    pub fn new(music_dir: PathBuf, alarm_dir: PathBuf) -> Self {
        Self {
            music_dir,
            alarm_dir,
        }
    }

    /// `<dir>/<track_id>.wav`; ids that could escape the directory are rejected
    pub fn resolve(&self, kind: TrackKind, track_id: &str) -> Result<PathBuf, ControlError> {
        if track_id.is_empty() || track_id.contains(['/', '\\']) || track_id.contains("..") {
            return Err(ControlError::invalid(format!(
                "invalid track id {track_id:?}"
            )));
        }

        let dir: &Path = match kind {
            TrackKind::Music => &self.music_dir,
            TrackKind::Alarm => &self.alarm_dir,
        };
        Ok(dir.join(format!("{track_id}.wav")))
    }
}

/// Translates text commands into controller calls
pub struct Router {
    light: Arc<LightController>,
    audio: Arc<AudioController>,
    alarm: AlarmSequencer,
    library: TrackLibrary,
}

impl Router {
    pub fn new(
        light: Arc<LightController>,
        audio: Arc<AudioController>,
        library: TrackLibrary,
    ) -> Self {
        let alarm = AlarmSequencer::new(light.clone(), audio.clone());
        Self {
            light,
            audio,
            alarm,
            library,
        }
    }

    /// Validate a payload. Never touches controller state.
    pub fn parse(&self, surface: Surface, payload: &str) -> Result<Command, ControlError> {
        match surface {
            Surface::Light => {
                // Anything without a comma turns the light off
                if !payload.contains(',') {
                    return Ok(Command::LightOff);
                }
                let fields = fields(payload, 3, "light")?;
                Ok(Command::LightOn(parse_rgb(&fields)?))
            }
            Surface::AudioOn => {
                let fields = fields(payload, 3, "audio-on")?;
                let volume = parse_volume(fields[1])?;
                let kind = fields[2].parse::<TrackKind>()?;
                let source = self.library.resolve(kind, fields[0])?;
                Ok(Command::AudioOn { source, volume })
            }
            Surface::Volume => {
                if payload.contains(',') {
                    return Err(ControlError::invalid(
                        "volume payload must be a single integer",
                    ));
                }
                Ok(Command::SetVolume(parse_volume(payload.trim())?))
            }
            Surface::AudioOff => Ok(Command::AudioOff),
            Surface::AlarmOn => {
                let fields = fields(payload, 6, "alarm-on")?;
                let ramp_secs = fields[0].parse::<u32>().map_err(|_| {
                    ControlError::invalid(format!("invalid ramp seconds {:?}", fields[0]))
                })?;
                let color = parse_rgb(&fields[1..4])?;
                let source = self.library.resolve(TrackKind::Alarm, fields[4])?;
                let volume = parse_volume(fields[5])?;
                Ok(Command::AlarmOn(AlarmRequest {
                    ramp_secs,
                    color,
                    source,
                    volume,
                }))
            }
            Surface::AlarmOff => Ok(Command::AlarmOff),
        }
    }

    /// Apply a command. `AlarmOn` blocks for the length of the ramp.
    pub fn dispatch(&self, command: Command) -> Result<(), ControlError> {
        match command {
            Command::LightOn(color) => {
                self.light.start();
                self.light.update_color(color, Transition::Immediate);
            }
            Command::LightOff => self.light.stop(),
            Command::AudioOn { source, volume } => {
                self.audio.start();
                self.audio.update_music(source, volume);
            }
            Command::SetVolume(volume) => self.audio.set_volume(volume)?,
            Command::AudioOff => self.audio.stop(),
            Command::AlarmOn(request) => self.alarm.alarm_on(request),
            Command::AlarmOff => self.alarm.alarm_off(),
        }
        Ok(())
    }

    /// Release all hardware
    pub fn shutdown(&self) {
        self.alarm.alarm_off();
    }
}

fn fields<'a>(
    payload: &'a str,
    expected: usize,
    surface: &str,
) -> Result<Vec<&'a str>, ControlError> {
    let fields: Vec<&str> = payload.split(',').map(str::trim).collect();
    if fields.len() != expected {
        return Err(ControlError::invalid(format!(
            "{surface} expects {expected} comma-separated fields, got {}",
            fields.len()
        )));
    }
    Ok(fields)
}

fn parse_rgb(fields: &[&str]) -> Result<Rgb, ControlError> {
    let channel = |field: &str| -> Result<f32, ControlError> {
        field
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ControlError::invalid(format!("invalid color channel {field:?}")))
    };
    Ok(Rgb::new(
        channel(fields[0])?,
        channel(fields[1])?,
        channel(fields[2])?,
    ))
}

fn parse_volume(field: &str) -> Result<Volume, ControlError> {
    let value = field
        .parse::<i64>()
        .map_err(|_| ControlError::invalid(format!("invalid volume {field:?}")))?;
    Volume::try_from(value)
}
