//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for [`ChannelClient`](crate::ChannelClient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Operator endpoint, `ws://` or `wss://`.
    pub endpoint: String,
    /// Upper bound on the WebSocket handshake, in milliseconds.
    pub connect_timeout_ms: u64,
    /// How long the dispatcher waits for the surface thread to answer a
    /// capture request, in milliseconds.
    pub capture_timeout_ms: u64,
    /// Maximum records held per queue; `0` means unbounded.
    pub queue_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://10.0.2.2:8765".into(),
            connect_timeout_ms: 10_000,
            capture_timeout_ms: 2_000,
            queue_capacity: 0,
        }
    }
}

impl ClientConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.max(1))
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms.max(1))
    }

    pub fn queue_capacity(&self) -> Option<usize> {
        (self.queue_capacity > 0).then_some(self.queue_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ClientConfig::default();
        assert!(cfg.endpoint.starts_with("ws://"));
        assert_eq!(cfg.capture_timeout(), Duration::from_secs(2));
        assert_eq!(cfg.queue_capacity(), None);
    }

    #[test]
    fn zero_timeouts_are_clamped() {
        let cfg = ClientConfig {
            connect_timeout_ms: 0,
            capture_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(cfg.connect_timeout(), Duration::from_millis(1));
        assert_eq!(cfg.capture_timeout(), Duration::from_millis(1));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: ClientConfig =
            serde_json::from_str(r#"{"endpoint":"ws://127.0.0.1:9000","queue_capacity":16}"#)
                .unwrap();
        assert_eq!(cfg.endpoint, "ws://127.0.0.1:9000");
        assert_eq!(cfg.queue_capacity(), Some(16));
        assert_eq!(cfg.connect_timeout_ms, 10_000);
    }
}
