//! Connection status of the stream session.
//!
//! This is what the user sees. Individual frame failures never change it;
//! only opening, losing and re-opening the byte source do.

use std::time::Instant;

use crate::error::ViewerError;

// ── ConnectionStatus ─────────────────────────────────────────────

/// The current state of the stream session.
///
/// ```text
///  Disconnected ──► Connecting ──► Connected
///       ▲               │              │
///       └───────────────┴──────────────┘
/// ```
///
/// `Connected` may also go straight back to `Connecting` when a
/// reconnect is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No open stream. Initial state, and the state after a failed reconnect.
    #[default]
    Disconnected,

    /// The byte source is being opened.
    Connecting,

    /// The stream is open and being read.
    Connected {
        /// When the stream was (re)opened.
        since: Instant,
    },
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected { .. } => write!(f, "Connected"),
        }
    }
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// How long the current stream has been open.
    ///
    /// Returns `None` unless connected.
    pub fn connected_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Connected { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connecting`.
    ///
    /// Valid from: `Disconnected`, `Connected` (reconnect).
    pub fn begin_connect(&mut self) -> Result<(), ViewerError> {
        match self {
            Self::Disconnected | Self::Connected { .. } => {
                *self = Self::Connecting;
                Ok(())
            }
            Self::Connecting => Err(ViewerError::InvalidTransition(
                "cannot connect: already connecting",
            )),
        }
    }

    /// Transition to `Connected`.
    ///
    /// Valid from: `Connecting`.
    pub fn complete_connect(&mut self) -> Result<(), ViewerError> {
        match self {
            Self::Connecting => {
                *self = Self::Connected {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(ViewerError::InvalidTransition(
                "cannot complete connect: not in Connecting state",
            )),
        }
    }

    /// Force-reset to `Disconnected` regardless of current state.
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut status = ConnectionStatus::Disconnected;

        status.begin_connect().unwrap();
        assert_eq!(status, ConnectionStatus::Connecting);

        status.complete_connect().unwrap();
        assert!(status.is_connected());
        assert!(status.connected_duration().is_some());

        status.force_disconnect();
        assert!(status.is_disconnected());
    }

    #[test]
    fn reconnect_from_connected() {
        let mut status = ConnectionStatus::Connected {
            since: Instant::now(),
        };
        status.begin_connect().unwrap();
        assert_eq!(status, ConnectionStatus::Connecting);
    }

    #[test]
    fn invalid_transition_connect_twice() {
        let mut status = ConnectionStatus::Connecting;
        assert!(status.begin_connect().is_err());
    }

    #[test]
    fn invalid_transition_complete_from_disconnected() {
        let mut status = ConnectionStatus::Disconnected;
        assert!(status.complete_connect().is_err());
        assert!(status.connected_duration().is_none());
    }

    #[test]
    fn display_format() {
        assert_eq!(ConnectionStatus::Disconnected.to_string(), "Disconnected");
        assert_eq!(ConnectionStatus::Connecting.to_string(), "Connecting");
        assert_eq!(
            ConnectionStatus::Connected {
                since: Instant::now()
            }
            .to_string(),
            "Connected"
        );
    }

    #[test]
    fn default_status_is_disconnected() {
        assert!(ConnectionStatus::default().is_disconnected());
    }
}
