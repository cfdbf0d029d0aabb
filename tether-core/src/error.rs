//! Domain-specific error types for the command channel.
//!
//! All fallible operations return `Result<T, ChannelError>`.
//! Data-path errors (`MalformedMessage`, `UnknownCommand`, `EmptyQueue`,
//! `CaptureUnavailable`) are recovered by the dispatcher; nothing in the
//! inbound path panics on bad input.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the command channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    // ── Data-path Errors ─────────────────────────────────────────
    /// An inbound frame could not be decoded into a command envelope.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A well-formed envelope carried a tag this client does not answer.
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    /// A dequeue was attempted on a queue with no pending records.
    #[error("{0} queue is empty")]
    EmptyQueue(&'static str),

    /// No live surface is bound, or the surface context is gone.
    #[error("capture unavailable: {0}")]
    CaptureUnavailable(&'static str),

    // ── Connection Errors ────────────────────────────────────────
    /// A frame was sent while the connection is not `Open`.
    #[error("not connected")]
    NotConnected,

    /// The transport reported a failure.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The configured endpoint is not a usable `ws://` / `wss://` URL.
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Encoding Errors ──────────────────────────────────────────
    /// Raster or envelope encoding failed.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl ChannelError {
    /// Returns `true` for the errors the dispatcher swallows after
    /// logging.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ChannelError::MalformedMessage(_)
                | ChannelError::UnknownCommand(_)
                | ChannelError::EmptyQueue(_)
                | ChannelError::CaptureUnavailable(_)
                | ChannelError::Timeout(_)
        )
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<serde_json::Error> for ChannelError {
    fn from(e: serde_json::Error) -> Self {
        ChannelError::MalformedMessage(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ChannelError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ChannelError::ConnectionFailed(e.to_string())
    }
}

impl From<image::ImageError> for ChannelError {
    fn from(e: image::ImageError) -> Self {
        ChannelError::Encoding(e.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for ChannelError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        ChannelError::ChannelClosed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = ChannelError::EmptyQueue("location");
        assert_eq!(e.to_string(), "location queue is empty");

        let e = ChannelError::InvalidEndpoint {
            endpoint: "ftp://x".into(),
            reason: "unsupported scheme".into(),
        };
        assert!(e.to_string().contains("ftp://x"));
        assert!(e.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn unknown_command_is_not_malformed() {
        let e = ChannelError::UnknownCommand("pull_contacts".into());
        assert_eq!(e.to_string(), r#"unknown command "pull_contacts""#);
        assert!(!matches!(e, ChannelError::MalformedMessage(_)));
    }

    #[test]
    fn from_json_is_malformed() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: ChannelError = json_err.into();
        assert!(matches!(e, ChannelError::MalformedMessage(_)));
    }

    #[test]
    fn recoverable_classification() {
        assert!(ChannelError::EmptyQueue("history").is_recoverable());
        assert!(ChannelError::CaptureUnavailable("no surface bound").is_recoverable());
        assert!(ChannelError::UnknownCommand("pull_contacts".into()).is_recoverable());
        assert!(!ChannelError::NotConnected.is_recoverable());
        assert!(!ChannelError::ConnectionFailed("reset".into()).is_recoverable());
    }
}
