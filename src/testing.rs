//! Recording fakes for the driver traits.

use crate::audio::{AudioBackend, AudioSink, AudioSource, Mixer, SinkParams, StreamSpec};
use crate::light::{LedStrip, StripBackend};
use crate::messages::{Rgb, Volume};
use anyhow::Result;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub enum HwEvent {
    SourceOpened(PathBuf),
    SourceClosed,
    SinkOpened(SinkParams),
    Write(Vec<i16>),
    Volume(u8),
    SinkClosed,
    StripOpened,
    Show(Rgb),
    StripClosed,
}

/// Ordered log of every hardware call, shared by all fakes in a test
#[derive(Default)]
pub struct HwLog {
    events: Mutex<Vec<HwEvent>>,
    changed: Condvar,
}

impl HwLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, event: HwEvent) {
        self.events.lock().push(event);
        self.changed.notify_all();
    }

    pub fn snapshot(&self) -> Vec<HwEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&HwEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }

    /// Block until `pred` holds over the log or `timeout` passes
    pub fn wait_until(&self, timeout: Duration, pred: impl Fn(&[HwEvent]) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut events = self.events.lock();
        while !pred(&events) {
            if self.changed.wait_until(&mut events, deadline).timed_out() {
                return pred(&events);
            }
        }
        true
    }

    pub fn shown(&self) -> Vec<Rgb> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                HwEvent::Show(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> Vec<Vec<i16>> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                HwEvent::Write(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }
}

pub struct FakeAudio {
    log: Arc<HwLog>,
    tracks: HashMap<PathBuf, (StreamSpec, Vec<i16>)>,
    fail_write_after: Option<usize>,
    close_delay: Duration,
}

impl FakeAudio {
    pub fn new(log: Arc<HwLog>) -> Self {
        Self {
            log,
            tracks: HashMap::new(),
            fail_write_after: None,
            close_delay: Duration::ZERO,
        }
    }

    /// Register a mono track whose samples count up from 0
    pub fn with_track(mut self, path: &str, frames: i16) -> Self {
        let spec = StreamSpec {
            sample_rate: 8000,
            channels: 1,
        };
        self.tracks
            .insert(PathBuf::from(path), (spec, (0..frames).collect()));
        self
    }

    pub fn failing_after(mut self, writes: usize) -> Self {
        self.fail_write_after = Some(writes);
        self
    }

    /// Make every sink block this long when closed
    pub fn slow_close(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }
}

impl AudioBackend for FakeAudio {
    fn open_source(&self, path: &Path) -> Result<Box<dyn AudioSource>> {
        let (spec, samples) = self
            .tracks
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such track: {:?}", path))?;
        self.log.push(HwEvent::SourceOpened(path.to_path_buf()));
        Ok(Box::new(FakeSource {
            log: self.log.clone(),
            spec,
            samples,
            pos: 0,
        }))
    }

    fn open_sink(&self, params: &SinkParams) -> Result<Box<dyn AudioSink>> {
        self.log.push(HwEvent::SinkOpened(*params));
        Ok(Box::new(FakeSink {
            log: self.log.clone(),
            mixer: Arc::new(FakeMixer {
                log: self.log.clone(),
                percent: AtomicU8::new(100),
            }),
            writes: 0,
            fail_after: self.fail_write_after,
            close_delay: self.close_delay,
        }))
    }
}

struct FakeSource {
    log: Arc<HwLog>,
    spec: StreamSpec,
    samples: Vec<i16>,
    pos: usize,
}

impl AudioSource for FakeSource {
    fn spec(&self) -> StreamSpec {
        self.spec
    }

    fn read_frames(&mut self, frames: usize, buf: &mut Vec<i16>) -> Result<usize> {
        let end = (self.pos + frames).min(self.samples.len());
        buf.clear();
        buf.extend_from_slice(&self.samples[self.pos..end]);
        let read = end - self.pos;
        self.pos = end;
        Ok(read)
    }

    fn rewind(&mut self) -> Result<()> {
        self.pos = 0;
        Ok(())
    }
}

impl Drop for FakeSource {
    fn drop(&mut self) {
        self.log.push(HwEvent::SourceClosed);
    }
}

struct FakeSink {
    log: Arc<HwLog>,
    mixer: Arc<FakeMixer>,
    writes: usize,
    fail_after: Option<usize>,
    close_delay: Duration,
}

impl AudioSink for FakeSink {
    fn write(&mut self, samples: &[i16]) -> Result<()> {
        if self.fail_after.is_some_and(|n| self.writes >= n) {
            anyhow::bail!("device unplugged");
        }
        self.writes += 1;
        self.log.push(HwEvent::Write(samples.to_vec()));
        std::thread::sleep(Duration::from_millis(1));
        Ok(())
    }

    fn mixer(&self) -> Arc<dyn Mixer> {
        self.mixer.clone()
    }
}

impl Drop for FakeSink {
    fn drop(&mut self) {
        std::thread::sleep(self.close_delay);
        self.log.push(HwEvent::SinkClosed);
    }
}

struct FakeMixer {
    log: Arc<HwLog>,
    percent: AtomicU8,
}

impl Mixer for FakeMixer {
    fn set_volume(&self, volume: Volume) -> Result<()> {
        self.percent.store(volume.percent(), Ordering::Relaxed);
        self.log.push(HwEvent::Volume(volume.percent()));
        Ok(())
    }

    fn volume(&self) -> Volume {
        Volume::try_from(i64::from(self.percent.load(Ordering::Relaxed))).unwrap()
    }
}

pub struct FakeStrips {
    log: Arc<HwLog>,
    shows: Arc<AtomicUsize>,
    fail_on_show: Option<usize>,
}

impl FakeStrips {
    pub fn new(log: Arc<HwLog>) -> Self {
        Self {
            log,
            shows: Arc::new(AtomicUsize::new(0)),
            fail_on_show: None,
        }
    }

    /// Make the n-th frame (counting from 0, across all opens) fail
    pub fn failing_on(mut self, show: usize) -> Self {
        self.fail_on_show = Some(show);
        self
    }
}

impl StripBackend for FakeStrips {
    fn open(&self) -> Result<Box<dyn LedStrip>> {
        self.log.push(HwEvent::StripOpened);
        Ok(Box::new(FakeStrip {
            log: self.log.clone(),
            shows: self.shows.clone(),
            fail_on_show: self.fail_on_show,
        }))
    }
}

struct FakeStrip {
    log: Arc<HwLog>,
    shows: Arc<AtomicUsize>,
    fail_on_show: Option<usize>,
}

impl LedStrip for FakeStrip {
    fn show(&mut self, color: Rgb) -> Result<()> {
        let n = self.shows.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_show == Some(n) {
            anyhow::bail!("strip disconnected");
        }
        self.log.push(HwEvent::Show(color));
        Ok(())
    }
}

impl Drop for FakeStrip {
    fn drop(&mut self) {
        self.log.push(HwEvent::StripClosed);
    }
}
