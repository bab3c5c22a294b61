//! Fixed-capacity stream buffer.
//!
//! Holds the tail of an unbounded byte stream in storage allocated once.
//! The valid bytes are the half-open span `[start, end)`; everything
//! outside it is stale and never exposed. Callers see the span only
//! through [`StreamBuffer::view`], so no raw offsets escape.
//!
//! Memory is bounded two ways:
//!
//! - [`append`](StreamBuffer::append) compacts and, if it must, truncates
//!   the incoming chunk. It can never write past `capacity`.
//! - [`compact_if_oversized`](StreamBuffer::compact_if_oversized) is the
//!   backpressure valve for streams that stop yielding complete frames.
//!   It always leaves at least `headroom` bytes free, so a full buffer
//!   keeps sliding forward instead of refusing every later chunk.

use crate::stream::scanner;

// ── Constants ────────────────────────────────────────────────────

/// Default storage size.
pub const DEFAULT_CAPACITY: usize = 512 * 1024;

/// Default occupancy fraction above which the valve runs.
pub const DEFAULT_COMPACT_THRESHOLD: f64 = 0.75;

/// Default number of trailing bytes kept when no start-marker is usable.
pub const DEFAULT_TAIL_WINDOW: usize = 32 * 1024;

// ── OversizePolicy ───────────────────────────────────────────────

/// Backpressure valve settings.
///
/// When occupancy exceeds the [`limit`](OversizePolicy::limit), the buffer
/// keeps only the bytes from the latest usable start-marker onward. If
/// there is no such marker it keeps the last `tail_window` bytes (never
/// more than the limit), so a stream that never produces a decodable
/// frame keeps sliding forward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OversizePolicy {
    /// Fraction of capacity (0.0..=1.0). A non-finite value falls back to
    /// [`DEFAULT_COMPACT_THRESHOLD`].
    pub threshold: f64,
    /// Bytes kept by the tail-window fallback.
    pub tail_window: usize,
}

impl OversizePolicy {
    /// Occupancy in bytes above which the valve fires.
    ///
    /// Capped so that at least `headroom` bytes (and never fewer than one)
    /// stay free once the valve has run, whatever the threshold says.
    pub fn limit(&self, capacity: usize, headroom: usize) -> usize {
        let threshold = if self.threshold.is_finite() {
            self.threshold.clamp(0.0, 1.0)
        } else {
            DEFAULT_COMPACT_THRESHOLD
        };
        let by_threshold = (capacity as f64 * threshold) as usize;
        by_threshold.min(capacity.saturating_sub(headroom.max(1)))
    }
}

impl Default for OversizePolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_COMPACT_THRESHOLD,
            tail_window: DEFAULT_TAIL_WINDOW,
        }
    }
}

/// What the backpressure valve did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compaction {
    /// Occupancy was within bounds, or nothing could be dropped.
    Untouched,
    /// Everything before a start-marker was dropped.
    KeptFromStartMarker { dropped: usize },
    /// No usable start-marker; only the tail window survived.
    KeptTail { dropped: usize },
}

// ── StreamBuffer ─────────────────────────────────────────────────

/// Capacity-bounded append buffer over a single allocation.
pub struct StreamBuffer {
    data: Box<[u8]>,
    start: usize,
    end: usize,
}

impl StreamBuffer {
    /// Allocate a buffer with fixed `capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            start: 0,
            end: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of valid bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Read-only view of the valid bytes.
    pub fn view(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }

    /// Drop everything (used on every reconnect).
    pub fn reset(&mut self) {
        self.start = 0;
        self.end = 0;
    }

    /// Append a chunk of stream bytes.
    ///
    /// Compacts first when the tail lacks room. If the chunk is still
    /// larger than the free space, only its newest bytes that fit are
    /// stored. Returns the number of chunk bytes that were not stored.
    pub fn append(&mut self, chunk: &[u8]) -> usize {
        if chunk.len() > self.capacity() - self.end {
            self.compact();
        }

        let free = self.capacity() - self.end;
        let (kept, truncated) = if chunk.len() > free {
            (&chunk[chunk.len() - free..], chunk.len() - free)
        } else {
            (chunk, 0)
        };

        self.data[self.end..self.end + kept.len()].copy_from_slice(kept);
        self.end += kept.len();
        truncated
    }

    /// Remove the first `n` bytes of the view.
    ///
    /// The remainder becomes the new view. It is physically moved back to
    /// offset 0 by the next compaction; an emptied buffer rewinds at once.
    pub fn discard_prefix(&mut self, n: usize) {
        self.start += n.min(self.len());
        if self.start == self.end {
            self.reset();
        }
    }

    /// Run the backpressure valve if occupancy exceeds the policy limit.
    ///
    /// `headroom` is the free space the next append needs, normally one
    /// read chunk. Keeps, in order of preference:
    /// 1. from the start of the latest complete frame onward (the caller
    ///    extracts it in the same cycle);
    /// 2. from the latest start-marker onward, if that alone fits under
    ///    the limit;
    /// 3. the last `tail_window` bytes, capped at the limit.
    pub fn compact_if_oversized(
        &mut self,
        policy: &OversizePolicy,
        headroom: usize,
    ) -> Compaction {
        let limit = policy.limit(self.capacity(), headroom);
        if self.len() <= limit {
            return Compaction::Untouched;
        }

        let view = self.view();
        if let Some(span) = scanner::find_latest_frame(view) {
            return self.keep_from(span.start);
        }
        if let Some(pos) = scanner::rfind_start_marker(view) {
            if view.len() - pos <= limit {
                return self.keep_from(pos);
            }
        }
        self.keep_tail(policy.tail_window.min(limit))
    }

    // ── Internal ─────────────────────────────────────────────────

    /// Shift the valid span down to offset 0.
    fn compact(&mut self) {
        if self.start == 0 {
            return;
        }
        self.data.copy_within(self.start..self.end, 0);
        self.end -= self.start;
        self.start = 0;
    }

    fn keep_from(&mut self, pos: usize) -> Compaction {
        if pos == 0 {
            return Compaction::Untouched;
        }
        self.discard_prefix(pos);
        self.compact();
        Compaction::KeptFromStartMarker { dropped: pos }
    }

    fn keep_tail(&mut self, window: usize) -> Compaction {
        if self.len() <= window {
            return Compaction::Untouched;
        }
        let dropped = self.len() - window;
        self.discard_prefix(dropped);
        self.compact();
        Compaction::KeptTail { dropped }
    }
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for StreamBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamBuffer")
            .field("capacity", &self.capacity())
            .field("start", &self.start)
            .field("end", &self.end)
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────
