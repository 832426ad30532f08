use super::worker::{Worker, WorkerShared};
use crate::error::ControlError;
use crate::light::{LedStrip, StripBackend};
use crate::messages::{LightCommand, Rgb, Transition};
use std::sync::Arc;
use std::time::Duration;

/// Pause after each ramp frame
pub const RAMP_TICK: Duration = Duration::from_millis(100);

/// Drives the LED strip from a dedicated worker thread.
///
/// Ramps run to completion once started; a color posted mid-ramp is applied
/// when the ramp ends. Only `stop` cuts a ramp short.
pub struct LightController {
    worker: Worker<LightCommand>,
    backend: Arc<dyn StripBackend>,
    tick: Duration,
}

impl LightController {
    pub fn new(backend: Arc<dyn StripBackend>) -> Self {
        Self {
            worker: Worker::new("light"),
            backend,
            tick: RAMP_TICK,
        }
    }

    #[cfg(test)]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn start(&self) {
        let backend = self.backend.clone();
        let tick = self.tick;
        self.worker
            .start(move |shared| run(shared, backend.as_ref(), tick));
    }

    pub fn update_color(&self, color: Rgb, transition: Transition) {
        tracing::debug!("Light update: {:?} ({:?})", color, transition);
        self.worker.post(LightCommand { color, transition });
    }

    /// Turn the strip dark, then stop the worker and release the strip
    pub fn stop(&self) {
        if self.worker.is_running() {
            self.worker.post(LightCommand::off());
        }
        self.worker.stop();
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }
}

fn run(
    shared: &WorkerShared<LightCommand>,
    backend: &dyn StripBackend,
    tick: Duration,
) -> Result<(), ControlError> {
    let mut strip = shared.fatal(backend.open().map_err(ControlError::StripWrite))?;
    let mut current = Rgb::OFF;

    while let Some(command) = shared.next_command() {
        let applied = match command.transition {
            Transition::Immediate => render(strip.as_mut(), &mut current, command.color),
            Transition::Ramp(steps) => {
                ramp(shared, strip.as_mut(), &mut current, command.color, steps, tick)
            }
        };
        shared.fatal(applied)?;
    }

    Ok(())
}

/// Linear ramp from the current color; `steps == 0` renders nothing
fn ramp(
    shared: &WorkerShared<LightCommand>,
    strip: &mut dyn LedStrip,
    current: &mut Rgb,
    target: Rgb,
    steps: u32,
    tick: Duration,
) -> Result<(), ControlError> {
    let start = *current;
    tracing::info!("Ramping {:?} -> {:?} over {} steps", start, target, steps);

    for k in 1..=steps {
        if !shared.is_running() {
            tracing::debug!("Ramp abandoned at step {}/{}", k - 1, steps);
            break;
        }
        render(strip, current, start.lerp(target, k, steps))?;
        std::thread::sleep(tick);
    }

    Ok(())
}

fn render(strip: &mut dyn LedStrip, current: &mut Rgb, color: Rgb) -> Result<(), ControlError> {
    strip.show(color).map_err(ControlError::StripWrite)?;
    *current = color;
    Ok(())
}
