//! Status line shown to the user.
//!
//! Only connection state and display toggles are surfaced here. Per-frame
//! failures never are; they show up in the periodic statistics instead.

use std::fmt;

use mjview_core::{ConnectionStatus, FrameStats, Rotation};

/// Snapshot of what the user can see and toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub endpoint: String,
    pub connection: String,
    pub rotation: Rotation,
    pub torch: bool,
    pub swap_bytes: bool,
}

impl StatusLine {
    pub fn new(
        endpoint: impl fmt::Display,
        status: &ConnectionStatus,
        rotation: Rotation,
        torch: bool,
        swap_bytes: bool,
    ) -> Self {
        let connection = status.to_string().to_ascii_lowercase();
        Self {
            endpoint: endpoint.to_string(),
            connection,
            rotation,
            torch,
            swap_bytes,
        }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} | rot {} | torch {} | swap {}",
            self.endpoint,
            self.connection,
            self.rotation,
            on_off(self.torch),
            on_off(self.swap_bytes),
        )
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

/// One-line summary of the stream counters, with the age of the current
/// connection when there is one.
pub fn format_stats(stats: &FrameStats, status: &ConnectionStatus) -> String {
    let mut line = format!(
        "{} KiB received, {} frames extracted, {} presented, {} rate-limited, {} failed, {} reconnects",
        stats.total_bytes / 1024,
        stats.frames_extracted,
        stats.frames_presented,
        stats.frames_rate_limited,
        stats.decode_failures,
        stats.reconnects,
    );
    if let Some(up) = status.connected_duration() {
        line.push_str(&format!(", connected {}s", up.as_secs()));
    }
    line
}
