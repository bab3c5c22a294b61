//! Frame decoder.
//!
//! Turns the bytes of an [`ExtractedFrame`](crate::stream::ExtractedFrame)
//! into tightly packed RGB pixels that the presenter can blit.

use std::io::Cursor;

use image::{DynamicImage, ImageDecoder};

use crate::error::ViewerError;

/// Channels per decoded pixel (red, green, blue).
pub const CHANNELS: usize = 3;

/// Default cap on decoded image size, in pixels.
pub const DEFAULT_MAX_PIXELS: usize = 1920 * 1080;

// ── DecodedImage ─────────────────────────────────────────────────

/// A decoded frame: `width * height` RGB8 pixels in row-major order.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DecodedImage {
    /// Wrap a pixel buffer, checking it covers `width * height` pixels.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ViewerError> {
        let expected = width as usize * height as usize * CHANNELS;
        if width == 0 || height == 0 {
            return Err(ViewerError::Decode(format!("empty image {width}x{height}")));
        }
        if pixels.len() < expected {
            return Err(ViewerError::Decode(format!(
                "pixel buffer too short: {} < {}",
                pixels.len(),
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGB bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// The RGB triple at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
        ]
    }
}

// ── FrameDecoder ─────────────────────────────────────────────────

/// Anything that can turn frame bytes into pixels.
///
/// A failure only costs the current frame; the caller keeps showing the
/// previous image.
pub trait FrameDecoder: Send {
    fn decode(&mut self, frame: &[u8]) -> Result<DecodedImage, ViewerError>;
}

// ── JpegDecoder ──────────────────────────────────────────────────

/// Baseline/progressive JPEG decoder backed by the `image` crate.
pub struct JpegDecoder {
    /// Frames larger than this are rejected before pixel decoding.
    max_pixels: usize,
}

impl JpegDecoder {
    pub fn new() -> Self {
        Self::with_max_pixels(DEFAULT_MAX_PIXELS)
    }

    pub fn with_max_pixels(max_pixels: usize) -> Self {
        Self { max_pixels }
    }
}

impl Default for JpegDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder for JpegDecoder {
    fn decode(&mut self, frame: &[u8]) -> Result<DecodedImage, ViewerError> {
        let decoder = image::codecs::jpeg::JpegDecoder::new(Cursor::new(frame))?;

        let (width, height) = decoder.dimensions();
        if width as usize * height as usize > self.max_pixels {
            return Err(ViewerError::Decode(format!(
                "image {width}x{height} exceeds {} pixel limit",
                self.max_pixels
            )));
        }

        // Grayscale and CMYK frames are converted here too.
        let rgb = DynamicImage::from_decoder(decoder)?.into_rgb8();
        DecodedImage::new(rgb.width(), rgb.height(), rgb.into_raw())
    }
}

// ── Tests ────────────────────────────────────────────────────────
