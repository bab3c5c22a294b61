//! Presenter: blits decoded RGB images onto a fixed-size RGB565 surface.
//!
//! The surface never changes size. Images are rotated by a multiple of
//! 90°, centered, and cropped around their center when they do not fit.
//! Presentation is a pure transform of pixels; it has no failure mode.

use serde::{Deserialize, Serialize};

use crate::decode::DecodedImage;

/// Default surface size (a small landscape LCD).
pub const DEFAULT_SURFACE_WIDTH: u32 = 400;
pub const DEFAULT_SURFACE_HEIGHT: u32 = 240;

// ── Rotation ─────────────────────────────────────────────────────

/// Counter-clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Any number of quarter turns, wrapped to `0..4`.
    pub const fn from_quarter_turns(turns: u8) -> Self {
        match turns % 4 {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    pub const fn quarter_turns(self) -> u8 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 1,
            Rotation::Deg180 => 2,
            Rotation::Deg270 => 3,
        }
    }

    /// One more quarter turn counter-clockwise.
    pub const fn rotate_left(self) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + 1)
    }

    /// One quarter turn clockwise.
    pub const fn rotate_right(self) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + 3)
    }

    /// Whether width and height trade places.
    pub const fn swaps_axes(self) -> bool {
        self.quarter_turns() % 2 == 1
    }
}

impl TryFrom<u8> for Rotation {
    type Error = String;

    fn try_from(turns: u8) -> Result<Self, Self::Error> {
        if turns > 3 {
            return Err(format!("rotation must be 0..=3 quarter turns, got {turns}"));
        }
        Ok(Self::from_quarter_turns(turns))
    }
}

impl From<Rotation> for u8 {
    fn from(r: Rotation) -> u8 {
        r.quarter_turns()
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}*90", self.quarter_turns())
    }
}

// ── Pixel conversion ─────────────────────────────────────────────

/// Pack 8-bit RGB into RGB565.
pub const fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    (((r as u16) >> 3) << 11) | (((g as u16) >> 2) << 5) | ((b as u16) >> 3)
}

// ── Placement ────────────────────────────────────────────────────

/// The surface rectangle a present call wrote to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

// ── Surface ──────────────────────────────────────────────────────

/// A fixed-size RGB565 framebuffer, row-major, `width` pixels per row.
#[derive(Debug, Clone)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u16>,
}

impl Surface {
    /// A black surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    /// Pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> u16 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    pub fn fill(&mut self, color: u16) {
        self.pixels.fill(color);
    }

    /// Little-endian byte image of the surface, as a framebuffer device
    /// expects it.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| p.to_le_bytes()).collect()
    }

    /// Draw `image` rotated by `rotation`, centered, cropped to fit.
    ///
    /// When the image does not cover the whole surface the rest is cleared
    /// to black. With `swap_bytes` the two bytes of every output pixel are
    /// exchanged, for panels wired big-endian.
    pub fn present(&mut self, image: &DecodedImage, rotation: Rotation, swap_bytes: bool) -> Placement {
        let (img_w, img_h) = (image.width(), image.height());
        let (rot_w, rot_h) = if rotation.swaps_axes() {
            (img_h, img_w)
        } else {
            (img_w, img_h)
        };

        let copy_w = rot_w.min(self.width);
        let copy_h = rot_h.min(self.height);
        let off_x = (self.width - copy_w) / 2;
        let off_y = (self.height - copy_h) / 2;
        // Crop symmetrically when the rotated image is larger than the surface.
        let crop_x = (rot_w - copy_w) / 2;
        let crop_y = (rot_h - copy_h) / 2;

        if copy_w < self.width || copy_h < self.height {
            self.fill(0);
        }

        let stride = self.width as usize;
        for ry in 0..copy_h {
            let row_start = (off_y + ry) as usize * stride + off_x as usize;
            let row = &mut self.pixels[row_start..row_start + copy_w as usize];
            let qy = ry + crop_y;
            for (rx, dst) in (0..copy_w).zip(row.iter_mut()) {
                let qx = rx + crop_x;
                let (sx, sy) = match rotation {
                    Rotation::Deg0 => (qx, qy),
                    Rotation::Deg90 => (img_w - 1 - qy, qx),
                    Rotation::Deg180 => (img_w - 1 - qx, img_h - 1 - qy),
                    Rotation::Deg270 => (qy, img_h - 1 - qx),
                };
                let [r, g, b] = image.rgb(sx, sy);
                let pix = rgb565(r, g, b);
                *dst = if swap_bytes { pix.swap_bytes() } else { pix };
            }
        }

        Placement {
            x: off_x,
            y: off_y,
            width: copy_w,
            height: copy_h,
        }
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new(DEFAULT_SURFACE_WIDTH, DEFAULT_SURFACE_HEIGHT)
    }
}

// ── Tests ────────────────────────────────────────────────────────
