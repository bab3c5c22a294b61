//! Viewer pipeline: selector → rate limiter → decoder → surface.
//!
//! [`Viewer::tick`] runs one ingestion cycle and, if it produced a frame
//! the limiter admits, decodes and presents it. A tick never sleeps; the
//! caller decides how long to idle afterwards (see [`crate::pacing`]).

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::decode::FrameDecoder;
use crate::error::ViewerError;
use crate::network::endpoint::StreamEndpoint;
use crate::network::source::ByteSource;
use crate::present::{Rotation, Surface};
use crate::state::ConnectionStatus;
use crate::stream::limiter::DecodeRateLimiter;
use crate::stream::selector::{CycleOutcome, ExtractedFrame, LatestFrameSelector};

// ── Tick ─────────────────────────────────────────────────────────

/// Summary of one tick, used by the caller's pacing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// A frame was decoded and drawn on the surface.
    Presented,
    /// A frame was admitted but failed to decode; the surface is unchanged.
    DecodeFailed,
    /// A frame arrived too soon after the last decode and was dropped.
    RateLimited,
    /// Bytes arrived, no complete frame yet.
    NoFrame,
    /// Nothing arrived.
    Idle,
    /// The stream died and was reopened.
    Reconnected,
    /// The stream died and could not be reopened.
    ReconnectFailed,
    /// No stream is open.
    Disconnected,
    /// The cycle was aborted and the buffer reset.
    Aborted,
}

// ── FrameStats ───────────────────────────────────────────────────

/// Counters exposed to the status display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Bytes received from the network.
    pub total_bytes: u64,
    /// Complete frames pulled out of the stream.
    pub frames_extracted: u64,
    /// Frames decoded and presented.
    pub frames_presented: u64,
    /// Frames dropped by the rate limiter.
    pub frames_rate_limited: u64,
    /// Frames dropped because they failed to decode.
    pub decode_failures: u64,
    /// Reconnect attempts.
    pub reconnects: u64,
}

// ── Viewer ───────────────────────────────────────────────────────

/// Owns the whole latest-frame pipeline for one stream.
pub struct Viewer<S, D> {
    selector: LatestFrameSelector<S>,
    limiter: DecodeRateLimiter,
    decoder: D,
    surface: Surface,
    rotation: Rotation,
    swap_bytes: bool,
    presented: u64,
    rate_limited: u64,
    decode_failures: u64,
}

impl<S: ByteSource, D: FrameDecoder> Viewer<S, D> {
    pub fn new(
        selector: LatestFrameSelector<S>,
        limiter: DecodeRateLimiter,
        decoder: D,
        surface: Surface,
    ) -> Self {
        Self {
            selector,
            limiter,
            decoder,
            surface,
            rotation: Rotation::default(),
            swap_bytes: false,
            presented: 0,
            rate_limited: 0,
            decode_failures: 0,
        }
    }

    // ── Connection ───────────────────────────────────────────────

    /// Open (or reopen) the stream. The rate limiter keeps its state.
    pub async fn connect(&mut self) -> Result<(), ViewerError> {
        self.selector.connect().await
    }

    /// Close the stream and release buffered bytes.
    pub async fn shutdown(&mut self) {
        self.selector.shutdown().await;
    }

    pub fn status(&self) -> &ConnectionStatus {
        self.selector.status()
    }

    pub fn endpoint(&self) -> &StreamEndpoint {
        self.selector.endpoint()
    }

    // ── Display settings ─────────────────────────────────────────

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
    }

    pub fn swap_bytes(&self) -> bool {
        self.swap_bytes
    }

    pub fn set_swap_bytes(&mut self, swap: bool) {
        self.swap_bytes = swap;
    }

    pub fn set_min_interval(&mut self, interval: Duration) {
        self.limiter.set_min_interval(interval);
    }

    /// The surface as last presented.
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn stats(&self) -> FrameStats {
        let s = self.selector.stats();
        FrameStats {
            total_bytes: s.bytes_received,
            frames_extracted: s.frames_extracted,
            frames_presented: self.presented,
            frames_rate_limited: self.rate_limited,
            decode_failures: self.decode_failures,
            reconnects: s.reconnects,
        }
    }

    // ── Pipeline ─────────────────────────────────────────────────

    /// Run one cycle and present its frame if the limiter allows.
    pub async fn tick(&mut self) -> Tick {
        let outcome = self.selector.cycle().await;
        self.handle(outcome, Instant::now())
    }

    /// Apply the result of a cycle observed at `now`.
    pub fn handle(&mut self, outcome: CycleOutcome, now: Instant) -> Tick {
        match outcome {
            CycleOutcome::Frame(frame) => self.offer(frame, now),
            CycleOutcome::NoFrame => Tick::NoFrame,
            CycleOutcome::Idle => Tick::Idle,
            CycleOutcome::Reconnected => Tick::Reconnected,
            CycleOutcome::ReconnectFailed(e) => {
                warn!("stream lost: {e}");
                Tick::ReconnectFailed
            }
            CycleOutcome::Disconnected => Tick::Disconnected,
            CycleOutcome::Aborted(_) => Tick::Aborted,
        }
    }

    fn offer(&mut self, frame: ExtractedFrame, now: Instant) -> Tick {
        if !self.limiter.try_acquire(now) {
            self.rate_limited += 1;
            return Tick::RateLimited;
        }

        match self.decoder.decode(frame.bytes()) {
            Ok(image) => {
                self.surface.present(&image, self.rotation, self.swap_bytes);
                self.presented += 1;
                Tick::Presented
            }
            Err(e) => {
                debug!("dropping {} byte frame: {e}", frame.len());
                self.decode_failures += 1;
                Tick::DecodeFailed
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::DecodedImage;
    use crate::network::source::Received;
    use crate::present::rgb565;
    use crate::stream::selector::SelectorConfig;
    use async_trait::async_trait;

    /// Never delivers bytes; frames are fed through `handle`.
    struct NullSource;

    #[async_trait]
    impl ByteSource for NullSource {
        async fn open(&mut self, _: &StreamEndpoint) -> Result<(), ViewerError> {
            Ok(())
        }
        async fn receive(&mut self, _: usize) -> Received {
            Received::idle()
        }
        async fn close(&mut self) {}
    }

    /// Decodes a frame whose first payload byte is `b'R'` into one red
    /// pixel and fails on anything else.
    #[derive(Default)]
    struct FakeDecoder {
        calls: usize,
    }

    impl FrameDecoder for FakeDecoder {
        fn decode(&mut self, frame: &[u8]) -> Result<DecodedImage, ViewerError> {
            self.calls += 1;
            match frame.get(2) {
                Some(b'R') => DecodedImage::new(1, 1, vec![0xFF, 0, 0]),
                _ => Err(ViewerError::Decode("bad frame".into())),
            }
        }
    }

    fn frame(tag: u8) -> CycleOutcome {
        let bytes = vec![0xFF, 0xD8, tag, 0xFF, 0xD9];
        CycleOutcome::Frame(ExtractedFrame::new(bytes.into()))
    }

    fn viewer() -> Viewer<NullSource, FakeDecoder> {
        let selector = LatestFrameSelector::new(
            NullSource,
            StreamEndpoint::new("cam", 80, "/video").unwrap(),
            SelectorConfig::default(),
        );
        Viewer::new(
            selector,
            DecodeRateLimiter::new(Duration::from_millis(100)),
            FakeDecoder::default(),
            Surface::new(1, 1),
        )
    }

    #[test]
    fn presents_then_rate_limits() {
        let mut v = viewer();
        let t0 = Instant::now();

        assert_eq!(v.handle(frame(b'R'), t0), Tick::Presented);
        assert_eq!(v.surface().pixel(0, 0), rgb565(0xFF, 0, 0));

        assert_eq!(v.handle(frame(b'R'), t0 + Duration::from_millis(40)), Tick::RateLimited);
        assert_eq!(v.decoder.calls, 1);

        let stats = v.stats();
        assert_eq!(stats.frames_presented, 1);
        assert_eq!(stats.frames_rate_limited, 1);
    }

    #[test]
    fn decode_failure_keeps_previous_image() {
        let mut v = viewer();
        let t0 = Instant::now();
        v.handle(frame(b'R'), t0);

        let later = t0 + Duration::from_millis(150);
        assert_eq!(v.handle(frame(b'x'), later), Tick::DecodeFailed);
        assert_eq!(v.surface().pixel(0, 0), rgb565(0xFF, 0, 0));
        assert_eq!(v.stats().decode_failures, 1);

        // The failed attempt still consumed the decode slot.
        assert_eq!(
            v.handle(frame(b'R'), later + Duration::from_millis(50)),
            Tick::RateLimited
        );
    }

    #[test]
    fn swap_and_rotation_apply_to_next_frame() {
        let mut v = viewer();
        v.set_swap_bytes(true);
        v.set_rotation(Rotation::Deg90);
        assert!(v.swap_bytes());
        assert_eq!(v.rotation(), Rotation::Deg90);

        v.handle(frame(b'R'), Instant::now());
        assert_eq!(v.surface().pixel(0, 0), rgb565(0xFF, 0, 0).swap_bytes());
    }

    #[test]
    fn non_frame_outcomes_map_to_ticks() {
        let mut v = viewer();
        let now = Instant::now();
        assert_eq!(v.handle(CycleOutcome::Idle, now), Tick::Idle);
        assert_eq!(v.handle(CycleOutcome::NoFrame, now), Tick::NoFrame);
        assert_eq!(v.handle(CycleOutcome::Disconnected, now), Tick::Disconnected);
        assert_eq!(v.handle(CycleOutcome::Reconnected, now), Tick::Reconnected);
        assert_eq!(
            v.handle(CycleOutcome::ReconnectFailed(ViewerError::HttpStatus(500)), now),
            Tick::ReconnectFailed
        );
        assert_eq!(
            v.handle(CycleOutcome::Aborted(ViewerError::OutOfMemory { requested: 64 }), now),
            Tick::Aborted
        );
        // None of these touched the surface or the counters.
        assert_eq!(v.stats().frames_presented, 0);
    }

    #[tokio::test]
    async fn tick_before_connect_is_disconnected() {
        let mut v = viewer();
        assert_eq!(v.tick().await, Tick::Disconnected);
        v.connect().await.unwrap();
        assert!(v.status().is_connected());
        assert_eq!(v.tick().await, Tick::Idle);
        v.shutdown().await;
        assert!(v.status().is_disconnected());
    }
}
