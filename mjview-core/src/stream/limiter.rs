//! Decode-rate limiter.
//!
//! Frame selection runs every cycle; decoding is expensive and runs at
//! most once per `min_interval`. The limiter is a plain value owned by
//! the caller and takes the current time as an argument, so tests drive
//! it with synthetic instants.

use std::time::{Duration, Instant};

/// Default spacing between decode attempts (~10 FPS).
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Gate that admits at most one decode attempt per `min_interval`.
#[derive(Debug, Clone)]
pub struct DecodeRateLimiter {
    /// Time of the last admitted decode attempt; `None` until the first.
    last_decode: Option<Instant>,
    min_interval: Duration,
}

impl DecodeRateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_decode: None,
            min_interval,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Change the spacing. Takes effect for the next frame.
    pub fn set_min_interval(&mut self, min_interval: Duration) {
        self.min_interval = min_interval;
    }

    /// Time of the last admitted decode attempt.
    pub fn last_decode(&self) -> Option<Instant> {
        self.last_decode
    }

    /// Whether a decode at `now` would be admitted.
    pub fn is_ready(&self, now: Instant) -> bool {
        match self.last_decode {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        }
    }

    /// Admit a decode at `now` if the interval has elapsed.
    ///
    /// The timestamp is taken *before* the caller decodes, so a slow decode
    /// cannot cause back-to-back attempts. Rejected frames leave the
    /// timestamp untouched.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if !self.is_ready(now) {
            return false;
        }
        self.last_decode = Some(now);
        true
    }
}

impl Default for DecodeRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

// ── Tests ────────────────────────────────────────────────────────
