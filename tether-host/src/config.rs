//! Configuration for the reference host.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tether_core::ClientConfig;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Command channel settings.
    pub client: ClientConfig,
    /// What the surface thread renders.
    pub surface: SurfaceConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// PNG shown as the bound surface. Empty: a generated test pattern.
    pub image: String,
    /// Test pattern width in pixels.
    pub width: u32,
    /// Test pattern height in pixels.
    pub height: u32,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            image: String::new(),
            width: 320,
            height: 240,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl HostConfig {
    /// Load configuration from a TOML file, falling back to defaults.
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

    /// The default configuration as TOML text.
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&Self::default())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = HostConfig::default_toml().unwrap();
        assert!(text.contains("[client]"));
        assert!(text.contains("endpoint"));
        assert!(text.contains("capture_timeout_ms"));
    }

    #[test]
    fn roundtrip_config() {
        let text = HostConfig::default_toml().unwrap();
        let parsed: HostConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.client, ClientConfig::default());
        assert_eq!(parsed.surface.width, 320);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let parsed: HostConfig = toml::from_str(
            r#"
            [client]
            endpoint = "ws://127.0.0.1:9001"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.client.endpoint, "ws://127.0.0.1:9001");
        assert_eq!(parsed.client.capture_timeout_ms, 2_000);
        assert_eq!(parsed.logging.level, "debug");
        assert!(parsed.surface.image.is_empty());
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = HostConfig::load(Path::new("/nonexistent/tether-host.toml"));
        assert_eq!(cfg.client, ClientConfig::default());
    }
}
