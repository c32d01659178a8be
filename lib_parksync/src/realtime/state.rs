//! # Connection State
//!
//! The live channel is always in exactly one of three states:
//!
//! ```text
//!            handshake ok
//! Connecting ------------> Open
//!     |  ^                   |
//!     |  | delay elapsed     | error / close
//!     v  |                   v
//!   Closed <-----------------+
//! ```
//!
//! `Closed -> Connecting` only happens while the owning client is started.

use serde::Serialize;
use std::fmt;

/// Lifecycle state of one realtime connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// A handshake is in flight.
    Connecting,
    /// The channel is delivering messages.
    Open,
    /// No connection. Either stopped, or waiting out the reconnect delay.
    Closed,
}

impl ConnectionState {
    /// Whether `self -> next` is an edge of the state machine.
    ///
    /// Staying in the same state is not a transition and returns `false`.
    pub fn permits(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Open) | (Connecting, Closed) | (Open, Closed) | (Closed, Connecting)
        )
    }

    /// True only for [`ConnectionState::Open`]; drives the connection badge.
    pub fn is_open(self) -> bool {
        self == ConnectionState::Open
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionState::*;

    #[test]
    fn test_permitted_edges() {
        assert!(Closed.permits(Connecting));
        assert!(Connecting.permits(Open));
        assert!(Connecting.permits(Closed));
        assert!(Open.permits(Closed));
    }

    #[test]
    fn test_rejected_edges() {
        // Reconnects always pass through Closed, and Open is only reached by a handshake.
        assert!(!Open.permits(Connecting));
        assert!(!Closed.permits(Open));
        assert!(!Open.permits(Open));
        assert!(!Closed.permits(Closed));
    }

    #[test]
    fn test_display_and_badge() {
        assert_eq!(Open.to_string(), "Open");
        assert!(Open.is_open());
        assert!(!Connecting.is_open());
    }
}
