//! Display sink: pushes the RGB565 surface to a framebuffer.
//!
//! The target is any seekable file: `/dev/fb0` on a device, or a plain
//! file when testing. Each flush rewrites the whole surface from offset 0.
//! With no target configured the viewer runs headless and flushes are
//! no-ops.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use mjview_core::Surface;
use tracing::info;

/// Where presented frames go.
pub enum DisplaySink {
    /// Nothing is written.
    Headless,
    /// A framebuffer device or image file.
    Framebuffer(File),
}

impl DisplaySink {
    /// Open `path` for writing; an empty path gives a headless sink.
    pub fn open(path: &str) -> std::io::Result<Self> {
        if path.is_empty() {
            info!("no framebuffer configured; running headless");
            return Ok(Self::Headless);
        }
        let file = OpenOptions::new()
            .write(true)
            .create(!path.starts_with("/dev/"))
            .truncate(false)
            .open(Path::new(path))?;
        info!("writing frames to {path}");
        Ok(Self::Framebuffer(file))
    }

    pub fn is_headless(&self) -> bool {
        matches!(self, Self::Headless)
    }

    /// Write the surface as little-endian RGB565.
    pub fn flush(&mut self, surface: &Surface) -> std::io::Result<()> {
        let Self::Framebuffer(file) = self else {
            return Ok(());
        };
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&surface.to_le_bytes())?;
        file.flush()
    }
}
