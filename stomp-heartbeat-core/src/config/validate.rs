//! Configuration validation rules.

use super::schema::Config;
use crate::heartbeat::{HeaderSide, HeartbeatHeader, HEART_BEAT_DISABLED};

/// Largest accepted receive tolerance, as a fraction of the interval
pub const MAX_RECEIVE_TOLERANCE: f64 = 10.0;

/// Whether `tolerance` is a usable grace fraction for the receive check
pub fn is_valid_receive_tolerance(tolerance: f64) -> bool {
    tolerance.is_finite() && (0.0..=MAX_RECEIVE_TOLERANCE).contains(&tolerance)
}

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    let header = &config.heartbeat.client_heart_beat;
    if header != HEART_BEAT_DISABLED {
        if let Err(e) = HeartbeatHeader::parse(HeaderSide::Client, header) {
            errors.push(format!("heartbeat.client_heart_beat: {}", e));
        }
    }

    if !is_valid_receive_tolerance(config.heartbeat.receive_tolerance) {
        errors.push(format!(
            "heartbeat.receive_tolerance must be in [0.0, {}]",
            MAX_RECEIVE_TOLERANCE
        ));
    }

    if config.logging.level.trim().is_empty() {
        errors.push("logging.level must not be empty".to_string());
    }
    if !matches!(
        config.logging.format.to_ascii_lowercase().as_str(),
        "text" | "json"
    ) {
        errors.push("logging.format must be text or json".to_string());
    }
    if config.logging.dir.trim().is_empty() {
        errors.push("logging.dir must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}
