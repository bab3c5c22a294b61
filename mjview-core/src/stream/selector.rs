//! Latest-frame selector.
//!
//! One [`cycle`](LatestFrameSelector::cycle) is one unit of ingestion
//! work: read a chunk, append it, run the backpressure valve, and pull
//! out the newest complete frame if there is one. Everything up to and
//! including that frame's end-marker is discarded, so older frames that
//! arrived in the same span are dropped without ever being copied.
//!
//! The selector is the only writer of the [`StreamBuffer`]. Frames leave
//! it as owned copies and never alias buffer storage.

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::error::ViewerError;
use crate::network::endpoint::StreamEndpoint;
use crate::network::source::{ByteSource, ReceiveStatus};
use crate::state::ConnectionStatus;
use crate::stream::buffer::{Compaction, DEFAULT_CAPACITY, OversizePolicy, StreamBuffer};
use crate::stream::scanner;

/// Default number of bytes requested from the source per cycle.
pub const READ_CHUNK: usize = 4096;

// ── SelectorConfig ───────────────────────────────────────────────

/// Sizing for [`LatestFrameSelector`].
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Fixed stream buffer size.
    pub buffer_capacity: usize,
    /// Bytes requested per read.
    pub read_chunk: usize,
    /// Backpressure valve settings.
    pub oversize: OversizePolicy,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_CAPACITY,
            read_chunk: READ_CHUNK,
            oversize: OversizePolicy::default(),
        }
    }
}

// ── ExtractedFrame ───────────────────────────────────────────────

/// Owned copy of one complete frame, start-marker through end-marker.
#[derive(Debug, Clone)]
pub struct ExtractedFrame {
    bytes: Bytes,
}

impl ExtractedFrame {
    pub(crate) fn new(bytes: Bytes) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

// ── CycleOutcome ─────────────────────────────────────────────────

/// What one ingestion cycle produced.
#[derive(Debug)]
pub enum CycleOutcome {
    /// The newest complete frame; older buffered data is gone.
    Frame(ExtractedFrame),
    /// Bytes were ingested but no complete frame is buffered yet.
    NoFrame,
    /// The source delivered nothing within its read wait.
    Idle,
    /// The source died and the single reconnect attempt succeeded.
    Reconnected,
    /// The source died and the reconnect attempt failed; now disconnected.
    ReconnectFailed(ViewerError),
    /// No stream is open. Nothing was read.
    Disconnected,
    /// Copying the frame out failed; the buffer was reset.
    Aborted(ViewerError),
}

// ── SelectorStats ────────────────────────────────────────────────

/// Running counters for the status display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorStats {
    /// Bytes delivered by the source.
    pub bytes_received: u64,
    /// Bytes refused by the buffer because a chunk did not fit.
    pub bytes_truncated: u64,
    /// Complete frames copied out.
    pub frames_extracted: u64,
    /// Times the backpressure valve dropped data.
    pub compactions: u64,
    /// Reconnect attempts triggered by a dead source.
    pub reconnects: u64,
}

// ── LatestFrameSelector ──────────────────────────────────────────

/// Drives a [`ByteSource`] into a [`StreamBuffer`] and yields at most one
/// frame per cycle, always the newest.
pub struct LatestFrameSelector<S> {
    source: S,
    endpoint: StreamEndpoint,
    buffer: StreamBuffer,
    config: SelectorConfig,
    status: ConnectionStatus,
    stats: SelectorStats,
}

impl<S: ByteSource> LatestFrameSelector<S> {
    /// Create a disconnected selector. Call [`connect`](Self::connect) to open.
    pub fn new(source: S, endpoint: StreamEndpoint, config: SelectorConfig) -> Self {
        Self {
            source,
            endpoint,
            buffer: StreamBuffer::with_capacity(config.buffer_capacity),
            config,
            status: ConnectionStatus::Disconnected,
            stats: SelectorStats::default(),
        }
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn stats(&self) -> &SelectorStats {
        &self.stats
    }

    pub fn endpoint(&self) -> &StreamEndpoint {
        &self.endpoint
    }

    /// Bytes currently buffered (the tail of the stream after the last
    /// extracted frame).
    pub fn buffered(&self) -> &[u8] {
        self.buffer.view()
    }

    /// Close any open stream, reset the buffer and open the endpoint.
    pub async fn connect(&mut self) -> Result<(), ViewerError> {
        self.source.close().await;
        self.buffer.reset();
        self.status.force_disconnect();
        self.status.begin_connect()?;

        match self.source.open(&self.endpoint).await {
            Ok(()) => {
                self.status.complete_connect()?;
                info!("connected to {}", self.endpoint);
                Ok(())
            }
            Err(e) => {
                self.status.force_disconnect();
                warn!("connect to {} failed: {e}", self.endpoint);
                Err(e)
            }
        }
    }

    /// Close the stream and drop buffered bytes.
    pub async fn disconnect(&mut self) {
        self.source.close().await;
        self.buffer.reset();
        self.status.force_disconnect();
    }

    /// Run one ingestion cycle.
    pub async fn cycle(&mut self) -> CycleOutcome {
        if !self.status.is_connected() {
            return CycleOutcome::Disconnected;
        }

        let received = self.source.receive(self.config.read_chunk).await;
        if received.is_dead() {
            match &received.status {
                ReceiveStatus::Failed(e) => warn!("stream read failed: {e}; reconnecting"),
                _ => info!("stream ended; reconnecting"),
            }
            self.stats.reconnects += 1;
            // Exactly one attempt; the caller paces any further retries.
            return match self.connect().await {
                Ok(()) => CycleOutcome::Reconnected,
                Err(e) => CycleOutcome::ReconnectFailed(e),
            };
        }

        if received.bytes.is_empty() {
            return CycleOutcome::Idle;
        }
        if let ReceiveStatus::Failed(e) = &received.status {
            debug!("read returned {} bytes with error: {e}", received.bytes.len());
        }

        self.ingest(&received.bytes);

        match self.extract_latest() {
            Ok(Some(frame)) => CycleOutcome::Frame(frame),
            Ok(None) => CycleOutcome::NoFrame,
            Err(e) => self.abort_cycle(e),
        }
    }

    /// Close the source and release buffered bytes. Called on shutdown.
    pub async fn shutdown(&mut self) {
        self.disconnect().await;
        debug!("selector shut down after {} frames", self.stats.frames_extracted);
    }

    // ── Internal ─────────────────────────────────────────────────

    fn ingest(&mut self, chunk: &[u8]) {
        self.stats.bytes_received += chunk.len() as u64;

        let truncated = self.buffer.append(chunk);
        if truncated > 0 {
            self.stats.bytes_truncated += truncated as u64;
            debug!("buffer full: dropped {truncated} incoming bytes");
        }

        // Leave room for the next read even when the buffer just filled up.
        let headroom = self.config.read_chunk;
        match self.buffer.compact_if_oversized(&self.config.oversize, headroom) {
            Compaction::Untouched => {}
            Compaction::KeptFromStartMarker { dropped } => {
                self.stats.compactions += 1;
                debug!("oversize valve: dropped {dropped} bytes before start-marker");
            }
            Compaction::KeptTail { dropped } => {
                self.stats.compactions += 1;
                debug!("oversize valve: no usable start-marker, dropped {dropped} bytes");
            }
        }
    }

    /// Copy the newest complete frame out and discard everything up to
    /// and including its end-marker.
    fn extract_latest(&mut self) -> Result<Option<ExtractedFrame>, ViewerError> {
        let view = self.buffer.view();
        let Some(span) = scanner::find_latest_frame(view) else {
            return Ok(None);
        };

        let mut owned = reserve_frame(span.len())?;
        owned.extend_from_slice(&view[span.range()]);

        self.buffer.discard_prefix(span.end);
        self.stats.frames_extracted += 1;
        Ok(Some(ExtractedFrame::new(Bytes::from(owned))))
    }

    /// Give up on the current cycle. The buffer is reset so the next
    /// cycle starts from fresh stream bytes.
    fn abort_cycle(&mut self, e: ViewerError) -> CycleOutcome {
        warn!("aborting cycle: {e}");
        self.buffer.reset();
        CycleOutcome::Aborted(e)
    }
}

/// Allocate room for a frame copy without aborting the process on failure.
fn reserve_frame(len: usize) -> Result<Vec<u8>, ViewerError> {
    let mut owned = Vec::new();
    owned
        .try_reserve_exact(len)
        .map_err(|_| ViewerError::OutOfMemory { requested: len })?;
    Ok(owned)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::source::Received;
    use crate::stream::buffer::DEFAULT_TAIL_WINDOW;
    use crate::stream::scanner::{END_MARKER, START_MARKER};
    use async_trait::async_trait;
    use std::collections::VecDeque;

    /// Replays a fixed script of receive results.
    #[derive(Default)]
    struct ScriptedSource {
        script: VecDeque<Received>,
        opens: usize,
        closes: usize,
        fail_open: bool,
    }

    impl ScriptedSource {
        fn with(script: Vec<Received>) -> Self {
            Self {
                script: script.into(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ByteSource for ScriptedSource {
        async fn open(&mut self, _endpoint: &StreamEndpoint) -> Result<(), ViewerError> {
            self.opens += 1;
            if self.fail_open {
                return Err(ViewerError::HttpStatus(503));
            }
            Ok(())
        }

        async fn receive(&mut self, max_bytes: usize) -> Received {
            match self.script.pop_front() {
                Some(mut r) => {
                    if r.bytes.len() > max_bytes {
                        let rest = r.bytes.split_off(max_bytes);
                        self.script.push_front(Received::data(rest));
                    }
                    r
                }
                None => Received::idle(),
            }
        }

        async fn close(&mut self) {
            self.closes += 1;
        }
    }

    fn jpeg(payload: &[u8]) -> Vec<u8> {
        let mut out = START_MARKER.to_vec();
        out.extend_from_slice(payload);
        out.extend_from_slice(&END_MARKER);
        out
    }

    fn endpoint() -> StreamEndpoint {
        StreamEndpoint::new("127.0.0.1", 8080, "/video").unwrap()
    }

    fn connected(source: ScriptedSource) -> LatestFrameSelector<ScriptedSource> {
        let mut selector = LatestFrameSelector::new(source, endpoint(), SelectorConfig::default());
        tokio_test::block_on(selector.connect()).unwrap();
        selector
    }

    #[test]
    fn disconnected_selector_reads_nothing() {
        let mut selector = LatestFrameSelector::new(
            ScriptedSource::with(vec![Received::data(jpeg(b"x"))]),
            endpoint(),
            SelectorConfig::default(),
        );
        let outcome = tokio_test::block_on(selector.cycle());
        assert!(matches!(outcome, CycleOutcome::Disconnected));
        assert_eq!(selector.stats().bytes_received, 0);
    }

    #[test]
    fn latest_frame_wins_and_tail_survives() {
        let mut chunk = b"A".to_vec();
        chunk.extend_from_slice(&jpeg(b"f1"));
        chunk.extend_from_slice(b"B");
        chunk.extend_from_slice(&jpeg(b"f2"));
        chunk.extend_from_slice(b"C");

        let mut selector = connected(ScriptedSource::with(vec![Received::data(chunk)]));
        match tokio_test::block_on(selector.cycle()) {
            CycleOutcome::Frame(frame) => assert_eq!(frame.bytes(), jpeg(b"f2").as_slice()),
            other => panic!("expected frame, got {other:?}"),
        }
        assert_eq!(selector.buffered(), b"C");
        assert_eq!(selector.stats().frames_extracted, 1);
    }

    #[test]
    fn frame_split_across_reads() {
        let frame = jpeg(b"split-me");
        let (first, second) = frame.split_at(5);
        let mut selector = connected(ScriptedSource::with(vec![
            Received::data(first.to_vec()),
            Received::data(second.to_vec()),
        ]));

        assert!(matches!(tokio_test::block_on(selector.cycle()), CycleOutcome::NoFrame));
        match tokio_test::block_on(selector.cycle()) {
            CycleOutcome::Frame(f) => assert_eq!(f.bytes(), frame.as_slice()),
            other => panic!("expected frame, got {other:?}"),
        }
        assert!(selector.buffered().is_empty());
    }

    #[test]
    fn end_marker_straddling_reads() {
        let mut first = jpeg(b"body");
        first.pop(); // leaves 0xFF dangling at the end
        let mut selector = connected(ScriptedSource::with(vec![
            Received::data(first),
            Received::data(vec![0xD9]),
        ]));

        assert!(matches!(tokio_test::block_on(selector.cycle()), CycleOutcome::NoFrame));
        assert!(matches!(tokio_test::block_on(selector.cycle()), CycleOutcome::Frame(_)));
    }

    #[test]
    fn idle_read_is_not_an_error() {
        let mut selector = connected(ScriptedSource::with(vec![]));
        assert!(matches!(tokio_test::block_on(selector.cycle()), CycleOutcome::Idle));
        assert!(selector.status().is_connected());
    }

    #[test]
    fn dead_read_reconnects_once_and_resets_buffer() {
        let mut partial = START_MARKER.to_vec();
        partial.extend_from_slice(b"incomplete");
        let mut selector = connected(ScriptedSource::with(vec![
            Received::data(partial),
            Received::failed(ViewerError::NotConnected),
            Received::failed(ViewerError::NotConnected),
        ]));
        assert!(matches!(tokio_test::block_on(selector.cycle()), CycleOutcome::NoFrame));
        assert!(!selector.buffered().is_empty());

        let opens_before = selector.source.opens;
        assert!(matches!(tokio_test::block_on(selector.cycle()), CycleOutcome::Reconnected));
        assert_eq!(selector.source.opens, opens_before + 1);
        assert!(selector.buffered().is_empty());
        assert!(selector.status().is_connected());
        assert_eq!(selector.stats().reconnects, 1);

        // The next failure gets its own single attempt, in its own cycle.
        assert!(matches!(tokio_test::block_on(selector.cycle()), CycleOutcome::Reconnected));
        assert_eq!(selector.source.opens, opens_before + 2);
    }

    #[test]
    fn end_of_stream_reconnects() {
        let mut selector = connected(ScriptedSource::with(vec![Received::end_of_stream()]));
        assert!(matches!(tokio_test::block_on(selector.cycle()), CycleOutcome::Reconnected));
    }

    #[test]
    fn failed_reconnect_marks_disconnected() {
        let mut selector = connected(ScriptedSource::with(vec![Received::failed(
            ViewerError::NotConnected,
        )]));
        selector.source.fail_open = true;

        let outcome = tokio_test::block_on(selector.cycle());
        assert!(matches!(outcome, CycleOutcome::ReconnectFailed(ViewerError::HttpStatus(503))));
        assert!(selector.status().is_disconnected());

        // No retry loop: the next cycle does not touch the source.
        let opens = selector.source.opens;
        assert!(matches!(tokio_test::block_on(selector.cycle()), CycleOutcome::Disconnected));
        assert_eq!(selector.source.opens, opens);
    }

    #[test]
    fn bytes_with_error_status_are_still_ingested() {
        let mut selector = connected(ScriptedSource::with(vec![Received {
            bytes: Bytes::from(jpeg(b"last")),
            status: ReceiveStatus::Failed(ViewerError::NotConnected),
        }]));
        assert!(matches!(tokio_test::block_on(selector.cycle()), CycleOutcome::Frame(_)));
    }

    #[test]
    fn garbage_stream_stays_bounded() {
        let config = SelectorConfig {
            buffer_capacity: 1024,
            read_chunk: 256,
            oversize: OversizePolicy {
                threshold: 0.75,
                tail_window: 64,
            },
        };
        let script = (0..40).map(|_| Received::data(vec![0x42u8; 256])).collect();
        let mut selector = LatestFrameSelector::new(ScriptedSource::with(script), endpoint(), config);
        tokio_test::block_on(selector.connect()).unwrap();

        for _ in 0..40 {
            let outcome = tokio_test::block_on(selector.cycle());
            assert!(matches!(outcome, CycleOutcome::NoFrame));
            assert!(selector.buffered().len() <= 768);
        }
        assert!(selector.stats().compactions > 0);
        assert_eq!(selector.stats().bytes_truncated, 0);
    }

    #[test]
    fn threshold_one_still_slides_to_the_next_frame() {
        let config = SelectorConfig {
            buffer_capacity: 1024,
            read_chunk: 256,
            oversize: OversizePolicy {
                threshold: 1.0,
                tail_window: DEFAULT_TAIL_WINDOW,
            },
        };
        let mut script: Vec<Received> =
            (0..4).map(|_| Received::data(vec![0x42u8; 256])).collect();
        let frame = jpeg(b"fresh");
        script.push(Received::data(frame.clone()));
        let mut selector = LatestFrameSelector::new(ScriptedSource::with(script), endpoint(), config);
        tokio_test::block_on(selector.connect()).unwrap();

        for _ in 0..4 {
            assert!(matches!(tokio_test::block_on(selector.cycle()), CycleOutcome::NoFrame));
            assert!(selector.buffered().len() <= 1024 - 256);
        }
        match tokio_test::block_on(selector.cycle()) {
            CycleOutcome::Frame(f) => assert_eq!(f.bytes(), frame.as_slice()),
            other => panic!("expected frame, got {other:?}"),
        }
        assert_eq!(selector.stats().bytes_truncated, 0);
        assert!(selector.stats().compactions > 0);
    }

    #[test]
    fn unaffordable_frame_copy_is_out_of_memory() {
        let err = reserve_frame(usize::MAX).unwrap_err();
        assert!(matches!(err, ViewerError::OutOfMemory { requested: usize::MAX }));
        assert_eq!(reserve_frame(16).unwrap().capacity(), 16);
    }

    #[test]
    fn aborted_cycle_resets_buffer_and_keeps_connection() {
        let mut partial = START_MARKER.to_vec();
        partial.extend_from_slice(b"pending");
        let mut selector = connected(ScriptedSource::with(vec![
            Received::data(partial),
            Received::data(jpeg(b"after")),
        ]));
        assert!(matches!(tokio_test::block_on(selector.cycle()), CycleOutcome::NoFrame));
        assert!(!selector.buffered().is_empty());

        let outcome = selector.abort_cycle(ViewerError::OutOfMemory { requested: 9 });
        assert!(matches!(outcome, CycleOutcome::Aborted(ViewerError::OutOfMemory { requested: 9 })));
        assert!(selector.buffered().is_empty());
        assert!(selector.status().is_connected());

        // The next cycle works from fresh bytes only.
        match tokio_test::block_on(selector.cycle()) {
            CycleOutcome::Frame(f) => assert_eq!(f.bytes(), jpeg(b"after").as_slice()),
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[test]
    fn connect_failure_leaves_disconnected() {
        let mut source = ScriptedSource::default();
        source.fail_open = true;
        let mut selector = LatestFrameSelector::new(source, endpoint(), SelectorConfig::default());
        assert!(tokio_test::block_on(selector.connect()).is_err());
        assert!(selector.status().is_disconnected());
    }

    #[test]
    fn shutdown_closes_source() {
        let mut selector = connected(ScriptedSource::with(vec![Received::data(b"abc".to_vec())]));
        tokio_test::block_on(selector.cycle());
        tokio_test::block_on(selector.shutdown());
        assert!(selector.status().is_disconnected());
        assert!(selector.buffered().is_empty());
        assert!(selector.source.closes >= 2);
    }
}
