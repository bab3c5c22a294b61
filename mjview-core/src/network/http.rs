//! HTTP implementation of [`ByteSource`], plus the camera torch switch.
//!
//! The MJPEG body is consumed as a raw byte stream. Multipart boundaries
//! and part headers are left in place; the frame scanner skips them
//! because it only looks for JPEG markers.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::error::ViewerError;
use crate::network::endpoint::StreamEndpoint;
use crate::network::source::{ByteSource, Received};

// ── HttpSourceConfig ─────────────────────────────────────────────

/// Settings for [`HttpStreamSource`].
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Sent as the `User-Agent` header.
    pub user_agent: String,
    /// TCP connect deadline.
    pub connect_timeout: Duration,
    /// Longest wait for response headers once the request is sent.
    pub response_timeout: Duration,
    /// Longest a single `receive` waits for body bytes.
    pub read_timeout: Duration,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("mjview/", env!("CARGO_PKG_VERSION")).into(),
            connect_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_millis(50),
        }
    }
}

// ── HttpStreamSource ─────────────────────────────────────────────

/// Streams the body of `GET http://host:port/path`.
///
/// Only a `200 OK` response counts as connected. Body chunks larger than
/// the requested size are held back and handed out on later calls.
pub struct HttpStreamSource {
    client: Client,
    response_timeout: Duration,
    read_timeout: Duration,
    body: Option<BoxStream<'static, reqwest::Result<Bytes>>>,
    pending: Bytes,
}

impl HttpStreamSource {
    pub fn new(config: &HttpSourceConfig) -> Result<Self, ViewerError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self {
            client,
            response_timeout: config.response_timeout,
            read_timeout: config.read_timeout,
            body: None,
            pending: Bytes::new(),
        })
    }

    /// Whether a response body is currently attached.
    pub fn is_open(&self) -> bool {
        self.body.is_some()
    }
}

#[async_trait]
impl ByteSource for HttpStreamSource {
    async fn open(&mut self, endpoint: &StreamEndpoint) -> Result<(), ViewerError> {
        self.close().await;

        let url = endpoint.stream_url();
        debug!("GET {url}");
        let response = send_within(self.client.get(&url), self.response_timeout).await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ViewerError::HttpStatus(status.as_u16()));
        }

        info!("stream open: {url}");
        self.body = Some(response.bytes_stream().boxed());
        Ok(())
    }

    async fn receive(&mut self, max_bytes: usize) -> Received {
        if !self.pending.is_empty() {
            let take = max_bytes.min(self.pending.len());
            return Received::data(self.pending.split_to(take));
        }

        let Some(body) = self.body.as_mut() else {
            return Received::failed(ViewerError::NotConnected);
        };

        match tokio::time::timeout(self.read_timeout, body.next()).await {
            Err(_) => Received::idle(),
            Ok(None) => Received::end_of_stream(),
            Ok(Some(Err(e))) => Received::failed(e.into()),
            Ok(Some(Ok(mut chunk))) => {
                if chunk.len() > max_bytes {
                    self.pending = chunk.split_off(max_bytes);
                }
                Received::data(chunk)
            }
        }
    }

    async fn close(&mut self) {
        self.body = None;
        self.pending.clear();
    }
}

// ── TorchControl ─────────────────────────────────────────────────

/// Switches the camera's flashlight via `/enabletorch` and `/disabletorch`.
///
/// The local state flips only when the camera answers with a 2xx status.
pub struct TorchControl {
    client: Client,
    response_timeout: Duration,
    on: bool,
}

impl TorchControl {
    pub fn new(config: &HttpSourceConfig) -> Result<Self, ViewerError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self {
            client,
            response_timeout: config.response_timeout,
            on: false,
        })
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Request the opposite of the current state; returns the new state.
    pub async fn toggle(&mut self, endpoint: &StreamEndpoint) -> Result<bool, ViewerError> {
        let path = if self.on { "/disabletorch" } else { "/enabletorch" };
        let request = self.client.get(endpoint.url_for(path));
        let response = send_within(request, self.response_timeout).await?;
        let status = response.status();
        // Drain so the connection can be reused.
        let _ = response.bytes().await;

        if status.is_success() {
            self.on = !self.on;
        } else {
            warn!("torch request {path} refused: {status}");
        }
        Ok(self.on)
    }
}

/// Send `request`, giving up if the response head takes longer than `limit`.
///
/// A camera that accepts the connection but never answers would otherwise
/// hold the caller forever.
async fn send_within(
    request: reqwest::RequestBuilder,
    limit: Duration,
) -> Result<reqwest::Response, ViewerError> {
    match tokio::time::timeout(limit, request.send()).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(ViewerError::Timeout(limit)),
    }
}
