//! Viewer configuration.

use std::path::Path;
use std::time::Duration;

use mjview_core::present::{DEFAULT_SURFACE_HEIGHT, DEFAULT_SURFACE_WIDTH};
use mjview_core::stream::READ_CHUNK;
use mjview_core::stream::buffer::{DEFAULT_CAPACITY, DEFAULT_COMPACT_THRESHOLD, DEFAULT_TAIL_WINDOW};
use mjview_core::{
    DEFAULT_STREAM_PATH, HttpSourceConfig, OversizePolicy, Pacing, Rotation, SelectorConfig,
    StreamEndpoint, ViewerError,
};
use serde::{Deserialize, Serialize};

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Camera address.
    pub network: NetworkConfig,
    /// Stream buffer sizing.
    pub stream: StreamConfig,
    /// Decode pacing.
    pub decode: DecodeConfig,
    /// Output surface.
    pub display: DisplayConfig,
    /// Main loop idle times.
    pub pacing: Pacing,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Camera IP or hostname.
    pub host: String,
    pub port: u16,
    /// Path of the MJPEG stream on the camera.
    pub stream_path: String,
    pub user_agent: String,
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Longest wait for the camera's response headers, in milliseconds.
    pub response_timeout_ms: u64,
    /// Longest a single read waits for bytes, in milliseconds.
    pub read_timeout_ms: u64,
    /// Connect on startup instead of waiting for a `connect` command.
    pub autoconnect: bool,
}

/// Stream buffer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Fixed buffer size in bytes.
    pub buffer_capacity: usize,
    /// Bytes requested per read.
    pub read_chunk: usize,
    /// Occupancy fraction that triggers compaction.
    pub compact_threshold: f64,
    /// Bytes kept when no start-marker survives compaction.
    pub tail_window: usize,
}

/// Decode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Minimum spacing between decodes in milliseconds.
    pub interval_ms: u64,
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    /// Counter-clockwise quarter turns, 0 to 3.
    pub rotation: Rotation,
    /// Swap the two bytes of every RGB565 pixel.
    pub swap_bytes: bool,
    /// Framebuffer device or file. Empty runs headless.
    pub framebuffer: String,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level, used when `RUST_LOG` is unset.
    pub level: String,
    /// Seconds between stream statistics lines. Zero disables them.
    pub stats_interval_secs: u64,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "192.168.2.198".into(),
            port: 8080,
            stream_path: DEFAULT_STREAM_PATH.into(),
            user_agent: "mjview".into(),
            connect_timeout_ms: 5000,
            response_timeout_ms: 5000,
            read_timeout_ms: 50,
            autoconnect: true,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_CAPACITY,
            read_chunk: READ_CHUNK,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            tail_window: DEFAULT_TAIL_WINDOW,
        }
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self { interval_ms: 100 }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_SURFACE_WIDTH,
            height: DEFAULT_SURFACE_HEIGHT,
            rotation: Rotation::Deg0,
            swap_bytes: false,
            framebuffer: String::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            stats_interval_secs: 10,
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ViewerConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    // ── Core settings ────────────────────────────────────────────

    /// The camera endpoint, validated.
    pub fn endpoint(&self) -> Result<StreamEndpoint, ViewerError> {
        StreamEndpoint::new(
            self.network.host.clone(),
            self.network.port,
            self.network.stream_path.clone(),
        )
    }

    pub fn http(&self) -> HttpSourceConfig {
        HttpSourceConfig {
            user_agent: self.network.user_agent.clone(),
            connect_timeout: Duration::from_millis(self.network.connect_timeout_ms),
            response_timeout: Duration::from_millis(self.network.response_timeout_ms),
            read_timeout: Duration::from_millis(self.network.read_timeout_ms),
        }
    }

    /// Selector sizing. A zero read chunk or capacity falls back to the default.
    ///
    /// The read chunk is capped at half the capacity, and the compaction
    /// threshold at the fraction that still leaves one read chunk free.
    pub fn selector(&self) -> SelectorConfig {
        let defaults = SelectorConfig::default();
        let buffer_capacity = nonzero_or(self.stream.buffer_capacity, defaults.buffer_capacity);
        let read_chunk = nonzero_or(self.stream.read_chunk, defaults.read_chunk)
            .min(buffer_capacity / 2)
            .max(1);
        let max_threshold = (buffer_capacity - read_chunk) as f64 / buffer_capacity as f64;

        let requested = self.stream.compact_threshold;
        let threshold = if requested.is_nan() {
            DEFAULT_COMPACT_THRESHOLD.min(max_threshold)
        } else {
            requested.clamp(0.0, max_threshold)
        };
        if threshold != requested {
            tracing::warn!("compact_threshold {requested} out of range; using {threshold}");
        }

        SelectorConfig {
            buffer_capacity,
            read_chunk,
            oversize: OversizePolicy {
                threshold,
                tail_window: self.stream.tail_window,
            },
        }
    }

    pub fn decode_interval(&self) -> Duration {
        Duration::from_millis(self.decode.interval_ms)
    }

    pub fn stats_interval(&self) -> Option<Duration> {
        match self.logging.stats_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn nonzero_or(value: usize, default: usize) -> usize {
    if value == 0 { default } else { value }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&ViewerConfig::default()).unwrap();
        assert!(text.contains("host = \"192.168.2.198\""));
        assert!(text.contains("interval_ms = 100"));
        assert!(text.contains("after_reconnect_ms = 200"));
        assert!(text.contains("rotation = 0"));
    }

    #[test]
    fn roundtrip_config() {
        let text = toml::to_string_pretty(&ViewerConfig::default()).unwrap();
        let parsed: ViewerConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.port, 8080);
        assert_eq!(parsed.display.width, 400);
        assert_eq!(parsed.stream.buffer_capacity, 512 * 1024);
        assert_eq!(parsed.pacing, Pacing::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let parsed: ViewerConfig = toml::from_str(
            "[network]\nhost = \"10.0.0.5\"\n\n[display]\nrotation = 3\nswap_bytes = true\n",
        )
        .unwrap();
        assert_eq!(parsed.network.host, "10.0.0.5");
        assert_eq!(parsed.network.port, 8080);
        assert_eq!(parsed.display.rotation, Rotation::Deg270);
        assert!(parsed.display.swap_bytes);
        assert_eq!(parsed.decode.interval_ms, 100);
    }

    #[test]
    fn out_of_range_rotation_is_rejected() {
        let parsed: Result<ViewerConfig, _> = toml::from_str("[display]\nrotation = 4\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn endpoint_is_validated() {
        let mut cfg = ViewerConfig::default();
        assert_eq!(cfg.endpoint().unwrap().stream_url(), "http://192.168.2.198:8080/video");

        cfg.network.host = "bad host".into();
        assert!(cfg.endpoint().is_err());
    }

    #[test]
    fn zero_sizes_fall_back() {
        let mut cfg = ViewerConfig::default();
        cfg.stream.read_chunk = 0;
        cfg.stream.buffer_capacity = 0;
        let selector = cfg.selector();
        assert_eq!(selector.read_chunk, READ_CHUNK);
        assert_eq!(selector.buffer_capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn full_threshold_is_clamped_below_one_read_chunk() {
        let mut cfg = ViewerConfig::default();
        cfg.stream.buffer_capacity = 1024;
        cfg.stream.read_chunk = 256;
        cfg.stream.compact_threshold = 1.0;
        let selector = cfg.selector();
        assert_eq!(selector.oversize.threshold, 0.75);
        assert_eq!(selector.oversize.limit(1024, selector.read_chunk), 768);

        cfg.stream.compact_threshold = f64::NAN;
        assert_eq!(cfg.selector().oversize.threshold, 0.75);

        cfg.stream.compact_threshold = -2.0;
        assert_eq!(cfg.selector().oversize.threshold, 0.0);
    }

    #[test]
    fn read_chunk_is_capped_at_half_the_buffer() {
        let mut cfg = ViewerConfig::default();
        cfg.stream.buffer_capacity = 1000;
        cfg.stream.read_chunk = 4096;
        let selector = cfg.selector();
        assert_eq!(selector.read_chunk, 500);
        assert!(selector.oversize.threshold <= 0.5);
    }

    #[test]
    fn default_sizing_passes_through() {
        let selector = ViewerConfig::default().selector();
        assert_eq!(selector.read_chunk, READ_CHUNK);
        assert_eq!(selector.oversize.threshold, DEFAULT_COMPACT_THRESHOLD);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = ViewerConfig::load(Path::new("/nonexistent/mjview.toml"));
        assert_eq!(cfg.network.port, 8080);
        assert_eq!(cfg.stats_interval(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn write_default_then_load() {
        let path = std::env::temp_dir().join(format!("mjview-test-{}.toml", std::process::id()));
        ViewerConfig::write_default(&path).unwrap();
        let cfg = ViewerConfig::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(cfg.decode_interval(), Duration::from_millis(100));
    }
}
