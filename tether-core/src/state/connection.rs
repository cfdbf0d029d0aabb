//! Connection state machine.
//!
//! Models the lifecycle of the single operator connection, with
//! validated transitions that return `Result` instead of panicking.

use std::time::Instant;

use crate::error::ChannelError;

// ── ConnectionPhase ──────────────────────────────────────────────

/// The current phase of the operator connection.
///
/// ```text
///  Unconnected ──► Connecting ──► Open ──► Closed
///                      │           │
///                      └─────┬─────┘
///                            ▼
///                          Failed
/// ```
///
/// `Closed` and `Failed` are terminal: there is no transition out of
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// Nothing attempted yet.
    #[default]
    Unconnected,

    /// Handshake with the endpoint in progress.
    Connecting,

    /// Ready for traffic in both directions.
    Open {
        /// When the connection entered the `Open` state.
        since: Instant,
    },

    /// Closed by either side.
    Closed { code: u16, reason: String },

    /// Transport failure.
    Failed { cause: String },
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unconnected => write!(f, "Unconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Open { .. } => write!(f, "Open"),
            Self::Closed { code, .. } => write!(f, "Closed({code})"),
            Self::Failed { .. } => write!(f, "Failed"),
        }
    }
}

impl ConnectionPhase {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// Returns `true` once the connection can no longer carry traffic.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed { .. } | Self::Failed { .. })
    }

    /// How long the connection has been `Open`.
    ///
    /// Returns `None` for any other phase.
    pub fn open_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Open { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Valid from: `Unconnected`.
    pub fn begin_connect(&mut self) -> Result<(), ChannelError> {
        match self {
            Self::Unconnected => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(ChannelError::ConnectionFailed(format!(
                "cannot connect from {self}"
            ))),
        }
    }

    /// Valid from: `Connecting`.
    pub fn open(&mut self) -> Result<(), ChannelError> {
        match self {
            Self::Connecting => {
                *self = Self::Open {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(ChannelError::ConnectionFailed(format!(
                "cannot open from {self}"
            ))),
        }
    }

    /// Valid from: `Open`.
    pub fn close(&mut self, code: u16, reason: impl Into<String>) -> Result<(), ChannelError> {
        match self {
            Self::Open { .. } => {
                *self = Self::Closed {
                    code,
                    reason: reason.into(),
                };
                Ok(())
            }
            _ => Err(ChannelError::ConnectionFailed(format!(
                "cannot close from {self}"
            ))),
        }
    }

    /// Valid from: `Connecting`, `Open`.
    pub fn fail(&mut self, cause: impl Into<String>) -> Result<(), ChannelError> {
        match self {
            Self::Connecting | Self::Open { .. } => {
                *self = Self::Failed {
                    cause: cause.into(),
                };
                Ok(())
            }
            _ => Err(ChannelError::ConnectionFailed(format!(
                "cannot fail from {self}"
            ))),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut phase = ConnectionPhase::Unconnected;

        phase.begin_connect().unwrap();
        assert_eq!(phase, ConnectionPhase::Connecting);

        phase.open().unwrap();
        assert!(phase.is_open());
        assert!(phase.open_duration().is_some());

        phase.close(1000, "bye").unwrap();
        assert!(phase.is_terminal());
        assert_eq!(
            phase,
            ConnectionPhase::Closed {
                code: 1000,
                reason: "bye".into()
            }
        );
    }

    #[test]
    fn connect_failure() {
        let mut phase = ConnectionPhase::Unconnected;
        phase.begin_connect().unwrap();
        phase.fail("refused").unwrap();
        assert!(phase.is_terminal());
        assert!(!phase.is_open());
    }

    #[test]
    fn failure_while_open() {
        let mut phase = ConnectionPhase::Open {
            since: Instant::now(),
        };
        phase.fail("reset by peer").unwrap();
        assert!(matches!(phase, ConnectionPhase::Failed { .. }));
    }

    #[test]
    fn terminal_states_stay_terminal() {
        let mut closed = ConnectionPhase::Closed {
            code: 1000,
            reason: String::new(),
        };
        assert!(closed.begin_connect().is_err());
        assert!(closed.open().is_err());
        assert!(closed.fail("x").is_err());
        assert!(closed.close(1000, "again").is_err());

        let mut failed = ConnectionPhase::Failed {
            cause: "x".into(),
        };
        assert!(failed.begin_connect().is_err());
        assert!(failed.open().is_err());
        assert!(failed.close(1000, "").is_err());
    }

    #[test]
    fn invalid_transition_open_from_unconnected() {
        let mut phase = ConnectionPhase::Unconnected;
        assert!(phase.open().is_err());
        assert!(phase.close(1000, "").is_err());
        assert!(phase.fail("x").is_err());
    }

    #[test]
    fn display_format() {
        assert_eq!(ConnectionPhase::Unconnected.to_string(), "Unconnected");
        assert_eq!(ConnectionPhase::Connecting.to_string(), "Connecting");
        assert_eq!(
            ConnectionPhase::Open {
                since: Instant::now()
            }
            .to_string(),
            "Open"
        );
        assert_eq!(
            ConnectionPhase::Closed {
                code: 1001,
                reason: "away".into()
            }
            .to_string(),
            "Closed(1001)"
        );
        assert_eq!(
            ConnectionPhase::Failed { cause: "x".into() }.to_string(),
            "Failed"
        );
    }

    #[test]
    fn default_phase_is_unconnected() {
        assert_eq!(ConnectionPhase::default(), ConnectionPhase::Unconnected);
    }
}
