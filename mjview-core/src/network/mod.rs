//! Network side of the viewer: endpoint, byte-source seam, HTTP impl.

pub mod endpoint;
pub mod http;
pub mod source;

pub use endpoint::{DEFAULT_STREAM_PATH, StreamEndpoint};
pub use http::{HttpSourceConfig, HttpStreamSource, TorchControl};
pub use source::{ByteSource, ReceiveStatus, Received};
