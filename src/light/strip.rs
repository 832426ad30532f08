use crate::messages::Rgb;
use anyhow::Result;
use smart_leds::{RGB8, SmartLedsWrite};
use std::convert::Infallible;

/// A strip rendering one color across all of its pixels.
/// Dropping it releases the hardware.
pub trait LedStrip {
    fn show(&mut self, color: Rgb) -> Result<()>;
}

/// Opens the strip for the light worker
pub trait StripBackend: Send + Sync {
    fn open(&self) -> Result<Box<dyn LedStrip>>;
}

/// Fills `pixels` LEDs with a single color through any smart-leds writer
pub struct PixelStrip<W> {
    writer: W,
    pixels: usize,
}

impl<W> PixelStrip<W> {
    pub fn new(writer: W, pixels: usize) -> Self {
        Self { writer, pixels }
    }
}

impl<W> LedStrip for PixelStrip<W>
where
    W: SmartLedsWrite<Color = RGB8>,
    W::Error: std::fmt::Debug,
{
    fn show(&mut self, color: Rgb) -> Result<()> {
        let pixel = color.to_rgb8();
        self.writer
            .write(std::iter::repeat_n(pixel, self.pixels))
            .map_err(|e| anyhow::anyhow!("Failed to write LED frame: {:?}", e))
    }
}

/// Writer that only logs frames, for hosts without a strip attached
pub struct LogWriter;

impl SmartLedsWrite for LogWriter {
    type Error = Infallible;
    type Color = RGB8;

    fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        let mut pixels = iterator.into_iter().map(Into::into);
        if let Some(first) = pixels.next() {
            tracing::debug!(
                "LED frame: ({}, {}, {}) x{}",
                first.r,
                first.g,
                first.b,
                pixels.count() + 1
            );
        }
        Ok(())
    }
}

pub struct LogStripBackend {
    pixels: usize,
}

impl LogStripBackend {
    pub fn new(pixels: usize) -> Self {
        Self { pixels }
    }
}

impl StripBackend for LogStripBackend {
    fn open(&self) -> Result<Box<dyn LedStrip>> {
        tracing::info!("Using log-only LED strip ({} pixels)", self.pixels);
        Ok(Box::new(PixelStrip::new(LogWriter, self.pixels)))
    }
}
