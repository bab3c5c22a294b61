//! Frame boundary scanner.
//!
//! Locates the newest complete JPEG frame inside a borrowed view of the
//! stream buffer. The rule is purely positional: the last end-marker in
//! the view, paired with the nearest start-marker before it. Nothing here
//! looks inside the JPEG; validity is the decoder's problem.

use std::ops::Range;

/// JPEG start-of-image marker.
pub const START_MARKER: [u8; 2] = [0xFF, 0xD8];

/// JPEG end-of-image marker.
pub const END_MARKER: [u8; 2] = [0xFF, 0xD9];

/// Both markers are two bytes long.
pub const MARKER_LEN: usize = 2;

// ── FrameSpan ────────────────────────────────────────────────────

/// Half-open byte range of a complete frame, relative to the scanned view.
///
/// `start` points at the start-marker, `end` one past the end-marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpan {
    pub start: usize,
    pub end: usize,
}

impl FrameSpan {
    /// Frame length in bytes, both markers included.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// The span as a slice range.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

// ── Scanning ─────────────────────────────────────────────────────

/// Position of the last occurrence of `marker` in `view`.
pub fn rfind_marker(view: &[u8], marker: [u8; 2]) -> Option<usize> {
    view.windows(MARKER_LEN).rposition(|w| w == &marker[..])
}

/// Position of the last start-marker in `view`, complete frame or not.
pub fn rfind_start_marker(view: &[u8]) -> Option<usize> {
    rfind_marker(view, START_MARKER)
}

/// Find the latest complete frame in `view`.
///
/// Returns `None` when there is no end-marker, or when the last
/// end-marker has no start-marker before it (stray end-markers are
/// noise, not errors). Any earlier start/end pairs are superseded.
pub fn find_latest_frame(view: &[u8]) -> Option<FrameSpan> {
    let eoi = rfind_marker(view, END_MARKER)?;
    // The start-marker must end at or before the end-marker begins.
    let soi = rfind_marker(&view[..eoi], START_MARKER)?;
    Some(FrameSpan {
        start: soi,
        end: eoi + MARKER_LEN,
    })
}

// ── Tests ────────────────────────────────────────────────────────
