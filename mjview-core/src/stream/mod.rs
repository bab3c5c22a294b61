//! # Stream demultiplexing and latest-frame selection
//!
//! ```text
//! ByteSource ──receive──► StreamBuffer ──view──► scanner
//!                               ▲                  │
//!                               └── discard ◄──────┘
//!                                                  │
//!                             ExtractedFrame ◄─────┘ ──► DecodeRateLimiter
//! ```
//!
//! | Module     | Purpose                                                  |
//! |------------|----------------------------------------------------------|
//! | `buffer`   | Fixed-capacity append buffer and the backpressure valve  |
//! | `scanner`  | Backward SOI/EOI search for the newest complete frame    |
//! | `selector` | One ingestion cycle: read, append, scan, extract, discard |
//! | `limiter`  | Minimum spacing between decode attempts                  |

pub mod buffer;
pub mod limiter;
pub mod scanner;
pub mod selector;

// ── Re-exports ───────────────────────────────────────────────────

pub use buffer::{Compaction, OversizePolicy, StreamBuffer};
pub use limiter::DecodeRateLimiter;
pub use scanner::{END_MARKER, FrameSpan, START_MARKER, find_latest_frame};
pub use selector::{
    CycleOutcome, ExtractedFrame, LatestFrameSelector, READ_CHUNK, SelectorConfig, SelectorStats,
};
