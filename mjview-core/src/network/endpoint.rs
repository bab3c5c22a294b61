//! Camera endpoint: host, port and stream path.
//!
//! Validation is shallow. Hosts are restricted to the
//! characters that can appear in an IPv4 address or a DNS name, ports
//! to decimal digits, and nothing is resolved here.

use std::fmt;

use crate::error::ViewerError;

/// Longest accepted host string.
pub const MAX_HOST_LEN: usize = 63;

/// Default stream path served by phone/IP camera apps.
pub const DEFAULT_STREAM_PATH: &str = "/video";

/// Where the MJPEG stream lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEndpoint {
    host: String,
    port: u16,
    path: String,
}

impl StreamEndpoint {
    /// Build an endpoint, validating each part.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        path: impl Into<String>,
    ) -> Result<Self, ViewerError> {
        let host = host.into();
        let path = path.into();
        validate_host(&host)?;
        if port == 0 {
            return Err(ViewerError::InvalidEndpoint("port must be non-zero".into()));
        }
        validate_path(&path)?;
        Ok(Self { host, port, path })
    }

    /// Parse a port typed as text. Only ASCII digits are accepted.
    pub fn parse_port(text: &str) -> Result<u16, ViewerError> {
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ViewerError::InvalidEndpoint(format!("port {text:?} is not numeric")));
        }
        match text.parse::<u16>() {
            Ok(0) | Err(_) => Err(ViewerError::InvalidEndpoint(format!(
                "port {text} out of range"
            ))),
            Ok(port) => Ok(port),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Full URL of the MJPEG stream.
    pub fn stream_url(&self) -> String {
        self.url_for(&self.path)
    }

    /// URL of another resource on the same camera, e.g. `/enabletorch`.
    pub fn url_for(&self, path: &str) -> String {
        format!("http://{}:{}{}", self.host, self.port, path)
    }
}

impl fmt::Display for StreamEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ── Validation ───────────────────────────────────────────────────

fn validate_host(host: &str) -> Result<(), ViewerError> {
    if host.is_empty() {
        return Err(ViewerError::InvalidEndpoint("host is empty".into()));
    }
    if host.len() > MAX_HOST_LEN {
        return Err(ViewerError::InvalidEndpoint(format!(
            "host longer than {MAX_HOST_LEN} characters"
        )));
    }
    if let Some(c) = host
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '.' || *c == '-'))
    {
        return Err(ViewerError::InvalidEndpoint(format!(
            "host contains invalid character {c:?}"
        )));
    }
    Ok(())
}

fn validate_path(path: &str) -> Result<(), ViewerError> {
    if !path.starts_with('/') {
        return Err(ViewerError::InvalidEndpoint(format!(
            "path {path:?} must start with '/'"
        )));
    }
    if path.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ViewerError::InvalidEndpoint(format!(
            "path {path:?} contains whitespace"
        )));
    }
    Ok(())
}
