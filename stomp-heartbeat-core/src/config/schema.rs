//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::heartbeat::DEFAULT_RECEIVE_TOLERANCE;

/// Root configuration for stomp-heartbeat
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Heart-beat configuration
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Heart-beat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// `heart-beat` header value this client declares on CONNECT
    #[serde(default = "default_client_heart_beat")]
    pub client_heart_beat: String,
    /// Fraction of the receive interval tolerated as extra silence
    #[serde(default = "default_receive_tolerance")]
    pub receive_tolerance: f64,
}

fn default_client_heart_beat() -> String {
    "10000,10000".to_string()
}

fn default_receive_tolerance() -> f64 {
    DEFAULT_RECEIVE_TOLERANCE
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            client_heart_beat: default_client_heart_beat(),
            receive_tolerance: default_receive_tolerance(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Days to keep rotated log files
    #[serde(default = "default_log_retention_days")]
    pub retention_days: u64,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_retention_days() -> u64 {
    7
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            retention_days: default_log_retention_days(),
            overrides: HashMap::new(),
        }
    }
}
