//! # mjview-core
//!
//! Latest-frame pipeline for MJPEG camera streams.
//!
//! This crate contains:
//! - **Stream**: `StreamBuffer`, the SOI/EOI scanner, `LatestFrameSelector` and `DecodeRateLimiter`
//! - **Network**: `StreamEndpoint`, the `ByteSource` seam, `HttpStreamSource` and `TorchControl`
//! - **Decode**: the `FrameDecoder` seam and `JpegDecoder`
//! - **Present**: `Surface`, an RGB565 framebuffer with rotation and byte swap
//! - **State**: `ConnectionStatus` for the stream session
//! - **Viewer**: `Viewer`, which ties the pieces together one tick at a time
//! - **Pacing**: how long the caller idles after each kind of tick
//! - **Error**: `ViewerError`, a `thiserror`-based error type

pub mod decode;
pub mod error;
pub mod network;
pub mod pacing;
pub mod present;
pub mod state;
pub mod stream;
pub mod viewer;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use decode::{DecodedImage, FrameDecoder, JpegDecoder};
pub use error::ViewerError;
pub use network::{
    ByteSource, DEFAULT_STREAM_PATH, HttpSourceConfig, HttpStreamSource, ReceiveStatus, Received,
    StreamEndpoint, TorchControl,
};
pub use pacing::Pacing;
pub use present::{Placement, Rotation, Surface, rgb565};
pub use state::ConnectionStatus;
pub use stream::{
    CycleOutcome, DecodeRateLimiter, ExtractedFrame, LatestFrameSelector, OversizePolicy,
    SelectorConfig, SelectorStats, StreamBuffer,
};
pub use viewer::{FrameStats, Tick, Viewer};
