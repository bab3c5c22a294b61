//! Loop pacing: how long the main loop yields after each tick.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::viewer::Tick;

/// Pauses between ticks, keyed by what the tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// After a read that delivered nothing.
    #[serde(rename = "idle_ms", with = "millis")]
    pub idle: Duration,
    /// After a frame reached the display.
    #[serde(rename = "after_present_ms", with = "millis")]
    pub after_present: Duration,
    /// After a reconnect attempt, successful or not.
    #[serde(rename = "after_reconnect_ms", with = "millis")]
    pub after_reconnect: Duration,
    /// While no stream is open.
    #[serde(rename = "disconnected_ms", with = "millis")]
    pub disconnected: Duration,
}

impl Pacing {
    /// The pause that should follow `tick`. Busy ticks get none.
    pub fn pause_after(&self, tick: Tick) -> Duration {
        match tick {
            Tick::Presented => self.after_present,
            Tick::Reconnected | Tick::ReconnectFailed => self.after_reconnect,
            Tick::Disconnected => self.disconnected,
            Tick::Idle => self.idle,
            Tick::DecodeFailed | Tick::RateLimited | Tick::NoFrame | Tick::Aborted => Duration::ZERO,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            idle: Duration::from_millis(1),
            after_present: Duration::from_millis(20),
            after_reconnect: Duration::from_millis(200),
            disconnected: Duration::from_millis(20),
        }
    }
}

/// Durations as whole milliseconds in config files.
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
