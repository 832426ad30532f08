use super::format::StreamSpec;
use super::source::AudioSource;
use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// WAV file source backed by hound
///
/// Only 16-bit integer PCM is accepted, matching the fixed playback format.
pub struct WavSource {
    reader: WavReader<BufReader<File>>,
    spec: StreamSpec,
}

impl WavSource {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {:?}", path))?;

        let wav_spec = reader.spec();
        if wav_spec.sample_format != SampleFormat::Int
            || wav_spec.bits_per_sample != StreamSpec::BITS_PER_SAMPLE
        {
            anyhow::bail!(
                "Unsupported WAV format: {}-bit {:?}, expected 16-bit integer PCM",
                wav_spec.bits_per_sample,
                wav_spec.sample_format
            );
        }
        if wav_spec.channels == 0 {
            anyhow::bail!("WAV file declares zero channels");
        }

        let spec = StreamSpec {
            sample_rate: wav_spec.sample_rate,
            channels: wav_spec.channels,
        };

        tracing::debug!(
            "Opened {:?}: {} Hz, {} channel(s), {} frames",
            path,
            spec.sample_rate,
            spec.channels,
            reader.duration()
        );

        Ok(Self { reader, spec })
    }
}

impl AudioSource for WavSource {
    fn spec(&self) -> StreamSpec {
        self.spec
    }

    fn read_frames(&mut self, frames: usize, buf: &mut Vec<i16>) -> Result<usize> {
        buf.clear();
        let wanted = self.spec.samples_for_frames(frames);
        for sample in self.reader.samples::<i16>().take(wanted) {
            buf.push(sample.context("Failed to decode WAV sample")?);
        }

        // Drop a trailing partial frame from a truncated file
        let channels = usize::from(self.spec.channels);
        let read = buf.len() / channels;
        buf.truncate(read * channels);
        Ok(read)
    }

    fn rewind(&mut self) -> Result<()> {
        self.reader.seek(0).context("Failed to rewind WAV file")
    }
}
