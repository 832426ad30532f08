use crate::error::ControlError;
use smart_leds::RGB8;
use std::path::PathBuf;

/// Output volume in percent (0..=100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Volume(u8);

impl Volume {
    pub const MAX: Volume = Volume(100);

    pub fn percent(self) -> u8 {
        self.0
    }

    /// Linear gain applied to samples
    pub fn gain(self) -> f32 {
        f32::from(self.0) / 100.0
    }
}

impl TryFrom<i64> for Volume {
    type Error = ControlError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match u8::try_from(value) {
            Ok(v) if v <= 100 => Ok(Self(v)),
            _ => Err(ControlError::invalid(format!(
                "volume {value} is outside 0..=100"
            ))),
        }
    }
}

impl std::fmt::Display for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Color on the 0-255 scale, kept as floats so ramps can interpolate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl Rgb {
    pub const OFF: Rgb = Rgb::new(0.0, 0.0, 0.0);

    pub const fn new(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }

    /// Point `k` of `steps` on the straight line from `self` to `target`.
    /// `k == steps` yields `target` exactly.
    pub fn lerp(self, target: Rgb, k: u32, steps: u32) -> Rgb {
        if k >= steps {
            return target;
        }
        let t = k as f32 / steps as f32;
        Rgb::new(
            self.red + (target.red - self.red) * t,
            self.green + (target.green - self.green) * t,
            self.blue + (target.blue - self.blue) * t,
        )
    }

    /// Quantize for the strip: round, then clamp to 0..=255
    pub fn to_rgb8(self) -> RGB8 {
        fn channel(v: f32) -> u8 {
            if v.is_nan() {
                0
            } else {
                v.round().clamp(0.0, 255.0) as u8
            }
        }
        RGB8::new(channel(self.red), channel(self.green), channel(self.blue))
    }
}

/// How the light worker reaches a new color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Immediate,
    /// Linear ramp over this many ramp ticks
    Ramp(u32),
}

/// Pending update for the light worker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightCommand {
    pub color: Rgb,
    pub transition: Transition,
}

impl LightCommand {
    pub fn off() -> Self {
        Self {
            color: Rgb::OFF,
            transition: Transition::Immediate,
        }
    }
}

/// Pending update for the audio worker
#[derive(Debug, Clone, PartialEq)]
pub struct AudioCommand {
    pub source: PathBuf,
    pub volume: Volume,
}

/// Which library directory a track id resolves against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Music,
    Alarm,
}

impl std::str::FromStr for TrackKind {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "music" => Ok(TrackKind::Music),
            "alarm" => Ok(TrackKind::Alarm),
            other => Err(ControlError::invalid(format!("unknown track kind {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_range() {
        assert_eq!(Volume::try_from(0).unwrap().percent(), 0);
        assert_eq!(Volume::try_from(100).unwrap(), Volume::MAX);
        assert!(Volume::try_from(101).is_err());
        assert!(Volume::try_from(-1).is_err());
    }

    #[test]
    fn test_lerp_ends_on_target() {
        let target = Rgb::new(9.0, 9.0, 9.0);
        for steps in [1, 3, 7, 50] {
            assert_eq!(Rgb::OFF.lerp(target, steps, steps), target);
        }
        assert_eq!(Rgb::OFF.lerp(target, 1, 2), Rgb::new(4.5, 4.5, 4.5));
    }

    #[test]
    fn test_quantize_rounds_and_clamps() {
        assert_eq!(Rgb::new(8.6, 300.0, -4.0).to_rgb8(), RGB8::new(9, 255, 0));
        assert_eq!(Rgb::new(f32::NAN, 0.4, 254.5).to_rgb8(), RGB8::new(0, 0, 255));
    }

    #[test]
    fn test_track_kind_names() {
        assert_eq!("music".parse::<TrackKind>().unwrap(), TrackKind::Music);
        assert_eq!("alarm".parse::<TrackKind>().unwrap(), TrackKind::Alarm);
        assert!("Music".parse::<TrackKind>().is_err());
    }

    #[test]
    fn test_gain_follows_percent() {
        assert_eq!(Volume::MAX.gain(), 1.0);
        assert_eq!(Volume::try_from(0).unwrap().gain(), 0.0);
        assert_eq!(Volume::try_from(50).unwrap().gain(), 0.5);
    }
}
