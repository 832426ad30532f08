use super::audio::AudioController;
use super::light::LightController;
use crate::messages::{Rgb, Transition, Volume};
use parking_lot::{Condvar, Mutex};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Ramp steps per second, matching the light worker's 100 ms tick
pub const RAMP_STEPS_PER_SEC: u32 = 10;

/// Extra wait after the ramp should have finished before audio starts
pub const RAMP_OVERSHOOT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct AlarmRequest {
    pub ramp_secs: u32,
    pub color: Rgb,
    pub source: PathBuf,
    pub volume: Volume,
}

impl AlarmRequest {
    pub fn ramp_steps(&self) -> u32 {
        self.ramp_secs.saturating_mul(RAMP_STEPS_PER_SEC)
    }

    /// How long `alarm_on` blocks between starting the ramp and the audio
    pub fn audio_delay(&self) -> Duration {
        Duration::from_secs(u64::from(self.ramp_secs)) + RAMP_OVERSHOOT
    }
}

/// Light ramp followed by audio, on top of the two controllers.
///
/// Every `alarm_off` bumps a generation counter. An alarm still waiting for
/// its ramp sees the bump and never starts the audio.
pub struct AlarmSequencer {
    light: Arc<LightController>,
    audio: Arc<AudioController>,
    generation: Mutex<u64>,
    cancelled: Condvar,
}

impl AlarmSequencer {
    pub fn new(light: Arc<LightController>, audio: Arc<AudioController>) -> Self {
        Self {
            light,
            audio,
            generation: Mutex::new(0),
            cancelled: Condvar::new(),
        }
    }

    /// Blocks the calling thread for the whole ramp; run it off any shared
    /// dispatch loop.
    pub fn alarm_on(&self, request: AlarmRequest) {
        tracing::info!(
            "Alarm on: {}s ramp to {:?}, then {:?} at {}",
            request.ramp_secs,
            request.color,
            request.source,
            request.volume
        );

        // Held while touching a controller so `alarm_off` always lands after
        let mut generation = self.generation.lock();
        let armed = *generation;

        self.light.start();
        self.light
            .update_color(request.color, Transition::Ramp(request.ramp_steps()));

        let deadline = Instant::now() + request.audio_delay();
        while *generation == armed {
            if self
                .cancelled
                .wait_until(&mut generation, deadline)
                .timed_out()
            {
                break;
            }
        }

        if *generation != armed {
            tracing::info!("Alarm cancelled before audio start");
            return;
        }

        self.audio.start();
        self.audio.update_music(request.source, request.volume);
    }

    /// Cancel any pending alarm, then lights first, then audio
    pub fn alarm_off(&self) {
        tracing::info!("Alarm off");
        {
            let mut generation = self.generation.lock();
            *generation = generation.wrapping_add(1);
            self.cancelled.notify_all();
        }
        self.light.stop();
        self.audio.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeAudio, FakeStrips, HwEvent, HwLog, WAIT};

    fn sequencer(log: &Arc<HwLog>) -> AlarmSequencer {
        let light = LightController::new(Arc::new(FakeStrips::new(log.clone())));
        let audio = AudioController::new(
            Arc::new(FakeAudio::new(log.clone()).with_track("Alarm/night1.wav", 64)),
            8,
        );
        AlarmSequencer::new(Arc::new(light), Arc::new(audio))
    }

    fn request(ramp_secs: u32) -> AlarmRequest {
        AlarmRequest {
            ramp_secs,
            color: Rgb::new(1.0, 0.0, 0.0),
            source: PathBuf::from("Alarm/night1.wav"),
            volume: Volume::try_from(40).unwrap(),
        }
    }

    #[test]
    fn test_timing_contract() {
        let req = request(5);
        assert_eq!(req.ramp_steps(), 50);
        assert_eq!(req.audio_delay(), Duration::from_millis(5100));
        assert_eq!(request(0).ramp_steps(), 0);
        assert_eq!(request(0).audio_delay(), RAMP_OVERSHOOT);
    }

    #[test]
    fn test_audio_starts_after_ramp() {
        let log = HwLog::new();
        let alarm = sequencer(&log);

        let started = Instant::now();
        alarm.alarm_on(request(1));
        assert!(started.elapsed() >= Duration::from_millis(1100));

        assert!(log.wait_until(WAIT, |events| {
            events.contains(&HwEvent::SourceOpened("Alarm/night1.wav".into()))
        }));
        assert!(log.wait_until(WAIT, |events| events.contains(&HwEvent::Volume(40))));

        // The light was started first and ramped through ten frames to the target
        let events = log.snapshot();
        assert_eq!(events[0], HwEvent::StripOpened);
        assert!(log.wait_until(WAIT, |events| {
            events.iter().filter(|e| matches!(e, HwEvent::Show(_))).count() == 10
        }));
        assert_eq!(*log.shown().last().unwrap(), Rgb::new(1.0, 0.0, 0.0));

        alarm.alarm_off();
    }

    #[test]
    fn test_alarm_off_stops_light_before_audio() {
        let log = HwLog::new();
        let alarm = sequencer(&log);

        alarm.alarm_on(request(0));
        assert!(log.wait_until(WAIT, |events| events.contains(&HwEvent::Volume(40))));

        alarm.alarm_off();
        let events = log.snapshot();
        let strip_closed = events.iter().position(|e| *e == HwEvent::StripClosed);
        let sink_closed = events.iter().position(|e| *e == HwEvent::SinkClosed);
        assert!(strip_closed.is_some() && sink_closed.is_some());
        assert!(strip_closed < sink_closed);
    }

    #[test]
    fn test_alarm_off_during_wait_skips_audio() {
        let log = HwLog::new();
        let alarm = Arc::new(sequencer(&log));

        let started = Instant::now();
        let pending = {
            let alarm = alarm.clone();
            std::thread::spawn(move || alarm.alarm_on(request(1)))
        };
        std::thread::sleep(Duration::from_millis(300));
        alarm.alarm_off();
        pending.join().unwrap();

        // The wait ended early instead of running out the ramp
        assert!(started.elapsed() < Duration::from_millis(1100));
        assert!(!alarm.light.is_running());
        assert!(!alarm.audio.is_running());
        assert_eq!(
            log.count(|e| matches!(e, HwEvent::SourceOpened(_) | HwEvent::SinkOpened(_))),
            0
        );

        // A later alarm is not affected by the earlier cancel
        alarm.alarm_on(request(0));
        assert!(log.wait_until(WAIT, |events| {
            events.contains(&HwEvent::SourceOpened("Alarm/night1.wav".into()))
        }));
        alarm.alarm_off();
    }
}
