//! Byte source abstraction.
//!
//! The selector never talks to sockets directly. It asks a [`ByteSource`]
//! for "up to N bytes" and gets back whatever arrived together with a
//! status. A source may return data *and* a failure status in the same
//! call; the bytes are still ingested and the failure surfaces on the
//! next empty read.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::ViewerError;
use crate::network::endpoint::StreamEndpoint;

// ── ReceiveStatus ────────────────────────────────────────────────

/// Outcome reported alongside the bytes of a receive call.
#[derive(Debug)]
pub enum ReceiveStatus {
    /// The stream is healthy. Zero bytes means nothing arrived in time.
    Ok,
    /// The server closed the body.
    EndOfStream,
    /// The transport failed.
    Failed(ViewerError),
}

// ── Received ─────────────────────────────────────────────────────

/// Result of a single [`ByteSource::receive`] call.
#[derive(Debug)]
pub struct Received {
    pub bytes: Bytes,
    pub status: ReceiveStatus,
}

impl Received {
    /// Bytes from a healthy stream.
    pub fn data(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            status: ReceiveStatus::Ok,
        }
    }

    /// Healthy stream, nothing arrived within the read wait.
    pub fn idle() -> Self {
        Self::data(Bytes::new())
    }

    pub fn end_of_stream() -> Self {
        Self {
            bytes: Bytes::new(),
            status: ReceiveStatus::EndOfStream,
        }
    }

    pub fn failed(error: ViewerError) -> Self {
        Self {
            bytes: Bytes::new(),
            status: ReceiveStatus::Failed(error),
        }
    }

    /// No bytes and a status that calls for a reconnect.
    pub fn is_dead(&self) -> bool {
        self.bytes.is_empty() && !matches!(self.status, ReceiveStatus::Ok)
    }
}

// ── ByteSource ───────────────────────────────────────────────────

/// A stream of raw bytes that can be opened, read and closed.
#[async_trait]
pub trait ByteSource: Send {
    /// Open (or reopen) the stream at `endpoint`.
    async fn open(&mut self, endpoint: &StreamEndpoint) -> Result<(), ViewerError>;

    /// Receive at most `max_bytes`. Waits no longer than the source's own
    /// read timeout.
    async fn receive(&mut self, max_bytes: usize) -> Received;

    /// Release the stream. Safe to call when nothing is open.
    async fn close(&mut self);
}
