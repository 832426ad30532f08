use anyhow::{Context, Result};
use smart_leds::{RGB8, SmartLedsWrite};
use spidev::{SpiModeFlags, Spidev, SpidevOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::strip::{LedStrip, PixelStrip, StripBackend};

/// SPI clock giving ~417 ns per bit, three SPI bits per WS2812 bit
const SPI_HZ: u32 = 2_400_000;

/// Zero bytes appended to every frame; >50 us low latches the strip
const LATCH_BYTES: usize = 24;

/// WS2812 ("NeoPixel") strip on a Linux spidev MOSI line
pub struct Ws2812Spi {
    spi: Spidev,
    buf: Vec<u8>,
}

impl Ws2812Spi {
    pub fn open(device: &Path) -> Result<Self> {
        let mut spi = Spidev::open(device)
            .with_context(|| format!("Failed to open SPI device: {:?}", device))?;

        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(SPI_HZ)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)
            .with_context(|| format!("Failed to configure SPI device: {:?}", device))?;

        Ok(Self {
            spi,
            buf: Vec::new(),
        })
    }
}

/// Encode pixels in GRB order, each data bit as `110` (one) or `100` (zero)
fn encode(pixels: impl Iterator<Item = RGB8>, buf: &mut Vec<u8>) {
    buf.clear();
    for pixel in pixels {
        for byte in [pixel.g, pixel.r, pixel.b] {
            let mut bits: u32 = 0;
            for i in (0..8).rev() {
                let pattern = if byte & (1 << i) != 0 { 0b110 } else { 0b100 };
                bits = (bits << 3) | pattern;
            }
            buf.extend_from_slice(&bits.to_be_bytes()[1..]);
        }
    }
    buf.extend(std::iter::repeat_n(0u8, LATCH_BYTES));
}

impl SmartLedsWrite for Ws2812Spi {
    type Error = io::Error;
    type Color = RGB8;

    fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        encode(iterator.into_iter().map(Into::into), &mut self.buf);
        self.spi.write_all(&self.buf)
    }
}

pub struct SpiStripBackend {
    device: PathBuf,
    pixels: usize,
}

impl SpiStripBackend {
    pub fn new(device: PathBuf, pixels: usize) -> Self {
        Self { device, pixels }
    }
}

impl StripBackend for SpiStripBackend {
    fn open(&self) -> Result<Box<dyn LedStrip>> {
        let writer = Ws2812Spi::open(&self.device)?;
        tracing::info!(
            "WS2812 strip open on {:?} ({} pixels)",
            self.device,
            self.pixels
        );
        Ok(Box::new(PixelStrip::new(writer, self.pixels)))
    }
}
