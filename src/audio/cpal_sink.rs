use super::format::SinkParams;
use super::sink::{AudioSink, Mixer};
use crate::messages::Volume;
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};
use ringbuf::{HeapProd, HeapRb, traits::*};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{Duration, Instant};

/// Periods of headroom between the writer and the device callback
const RING_PERIODS: usize = 4;

/// A write that cannot make progress for this long is treated as a device failure
const STALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Software volume shared with the device callback
pub struct SoftwareMixer {
    percent: AtomicU8,
}

impl SoftwareMixer {
    fn new() -> Self {
        Self {
            percent: AtomicU8::new(Volume::MAX.percent()),
        }
    }

    fn gain(&self) -> f32 {
        self.volume().gain()
    }
}

impl Mixer for SoftwareMixer {
    fn set_volume(&self, volume: Volume) -> Result<()> {
        self.percent.store(volume.percent(), Ordering::Relaxed);
        Ok(())
    }

    fn volume(&self) -> Volume {
        Volume::try_from(i64::from(self.percent.load(Ordering::Relaxed))).unwrap_or(Volume::MAX)
    }
}

/// Playback through cpal
///
/// `write` pushes samples into a ring buffer sized to a few periods and
/// blocks while it is full; the device callback drains it, applying the
/// mixer gain and filling underruns with silence. The stream is stopped when
/// the sink is dropped.
///
/// cpal::Stream is !Send on some hosts, so the sink must stay on the thread
/// that opened it.
pub struct CpalSink {
    _stream: cpal::Stream,
    producer: HeapProd<i16>,
    mixer: Arc<SoftwareMixer>,
    failed: Arc<AtomicBool>,
}

impl CpalSink {
    pub fn open(device_name: Option<&str>, params: &SinkParams) -> Result<Self> {
        let host = cpal::default_host();
        let device = match device_name {
            Some(name) => host
                .output_devices()
                .context("Failed to enumerate output devices")?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .with_context(|| format!("Output device not found: {}", name))?,
            None => host
                .default_output_device()
                .context("No output audio device available")?,
        };

        let config = StreamConfig {
            channels: params.spec.channels,
            sample_rate: SampleRate(params.spec.sample_rate),
            buffer_size: BufferSize::Fixed(params.period_frames as u32),
        };

        let ring = HeapRb::<i16>::new(params.period_samples() * RING_PERIODS);
        let (producer, mut consumer) = ring.split();

        let mixer = Arc::new(SoftwareMixer::new());
        let mixer_callback = mixer.clone();
        let failed = Arc::new(AtomicBool::new(false));
        let failed_callback = failed.clone();

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [i16], _info: &cpal::OutputCallbackInfo| {
                    let gain = mixer_callback.gain();
                    let filled = consumer.pop_slice(data);
                    for sample in &mut data[..filled] {
                        *sample = (f32::from(*sample) * gain) as i16;
                    }
                    data[filled..].fill(0);
                },
                move |err| {
                    tracing::error!("Audio output stream error: {}", err);
                    failed_callback.store(true, Ordering::Release);
                },
                None,
            )
            .context("Failed to build output stream")?;

        stream.play().context("Failed to start audio stream")?;

        tracing::info!(
            "Playback device open: {} Hz, {} channel(s), {} frames/period",
            params.spec.sample_rate,
            params.spec.channels,
            params.period_frames
        );

        Ok(Self {
            _stream: stream,
            producer,
            mixer,
            failed,
        })
    }
}

impl AudioSink for CpalSink {
    fn write(&mut self, samples: &[i16]) -> Result<()> {
        let mut remaining = samples;
        let mut last_progress = Instant::now();

        while !remaining.is_empty() {
            if self.failed.load(Ordering::Acquire) {
                anyhow::bail!("Output stream reported an error");
            }

            let written = self.producer.push_slice(remaining);
            if written > 0 {
                remaining = &remaining[written..];
                last_progress = Instant::now();
            } else if last_progress.elapsed() > STALL_TIMEOUT {
                anyhow::bail!("Output device stalled for {:?}", STALL_TIMEOUT);
            } else {
                // Buffer full, wait for the callback to drain it
                std::thread::sleep(Duration::from_millis(1));
            }
        }

        Ok(())
    }

    fn mixer(&self) -> Arc<dyn Mixer> {
        self.mixer.clone()
    }
}
