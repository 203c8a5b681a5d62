//! Viewer configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use viewlink_core::{ConnectionConfig, QualityLevel};

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Frame buffering.
    pub buffer: BufferConfig,
    /// Stream quality.
    pub quality: QualityConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Producer address (IP:port).
    pub server_address: String,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Heartbeat ping interval in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// First reconnect delay in milliseconds; doubles per attempt.
    pub reconnect_base_delay_ms: u64,
    /// Automatic reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,
}

/// Frame buffering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Max buffered frames.
    pub capacity: usize,
    /// Evict frames older than this many milliseconds (0 = never).
    pub max_frame_age_ms: i64,
}

/// Stream quality.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Initial level: "high", "medium" or "low".
    pub level: String,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            buffer: BufferConfig::default(),
            quality: QualityConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1:8080".into(),
            connect_timeout_ms: 10_000,
            heartbeat_interval_ms: 10_000,
            reconnect_base_delay_ms: 1_000,
            max_reconnect_attempts: 5,
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 30,
            max_frame_age_ms: 10_000,
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            level: "high".into(),
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

    /// Map onto the core connection tunables.
    pub fn connection_config(&self, initial_quality: QualityLevel) -> ConnectionConfig {
        ConnectionConfig {
            connect_timeout: Duration::from_millis(self.network.connect_timeout_ms),
            heartbeat_interval: Duration::from_millis(self.network.heartbeat_interval_ms),
            reconnect_base_delay: Duration::from_millis(self.network.reconnect_base_delay_ms),
            max_reconnect_attempts: self.network.max_reconnect_attempts,
            frame_capacity: self.buffer.capacity,
            max_frame_age_ms: (self.buffer.max_frame_age_ms > 0)
                .then_some(self.buffer.max_frame_age_ms),
            initial_quality,
            ..ConnectionConfig::default()
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
