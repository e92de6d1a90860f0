use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::schema::LoggingConfig;

/// File name prefix for rolled log files
const LOG_FILE_PREFIX: &str = "stomp-heartbeat.log";

/// Build the level filter from `RUST_LOG`, the configured level and overrides
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| config.level.clone());

    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level_str));

    for (module, level) in &config.overrides {
        if let Ok(directive) = format!("{}={}", module, level).parse() {
            filter = filter.add_directive(directive);
        } else {
            eprintln!("Invalid log directive: {}={}", module, level);
        }
    }

    filter
}

/// Initialize the logging system
///
/// Logs go to stdout and to a daily-rolling file under `config.dir`. The
/// returned guard must be held for as long as file logging is wanted.
pub fn init_logging(config: &LoggingConfig) -> WorkerGuard {
    let filter = build_filter(config);

    let format_str = std::env::var("LOG_FORMAT").unwrap_or_else(|_| config.format.clone());
    let is_json = format_str.eq_ignore_ascii_case("json");

    // Produces stomp-heartbeat.log.YYYY-MM-DD
    let file_appender = tracing_appender::rolling::daily(&config.dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = if is_json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    };

    let file_layer = if is_json {
        fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    };

    // A subscriber may already be installed (tests, embedding applications)
    if let Err(e) = Registry::default()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("Logging already initialized: {}", e);
    }

    if let Err(e) = cleanup_old_logs(&config.dir, config.retention_days) {
        eprintln!("Failed to clean up old logs: {}", e);
    }

    guard
}

/// Remove rolled log files older than `days` days
pub fn cleanup_old_logs(dir: &str, days: u64) -> std::io::Result<usize> {
    let path = Path::new(dir);
    if !path.exists() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let threshold = Duration::from_secs(days.saturating_mul(24 * 3600));
    let mut removed = 0;

    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let path = entry.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
        if !path.is_file() || !is_log {
            continue;
        }

        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if age.is_some_and(|age| age > threshold) {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => eprintln!("Failed to remove old log file {:?}: {}", path, e),
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cleanup_missing_dir_is_noop() {
        assert_eq!(cleanup_old_logs("/nonexistent/stomp-heartbeat-logs", 7).unwrap(), 0);
    }

    #[test]
    fn test_cleanup_keeps_fresh_and_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        let fresh = temp_dir.path().join(format!("{}.2026-01-01", LOG_FILE_PREFIX));
        let foreign = temp_dir.path().join("notes.txt");
        std::fs::write(&fresh, "log").unwrap();
        std::fs::write(&foreign, "keep").unwrap();

        let removed = cleanup_old_logs(temp_dir.path().to_str().unwrap(), 7).unwrap();
        assert_eq!(removed, 0);
        assert!(fresh.exists());
        assert!(foreign.exists());
    }

    #[test]
    fn test_cleanup_with_huge_retention_keeps_everything() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join(format!("{}.2026-01-01", LOG_FILE_PREFIX));
        std::fs::write(&log, "log").unwrap();

        let removed = cleanup_old_logs(temp_dir.path().to_str().unwrap(), u64::MAX).unwrap();
        assert_eq!(removed, 0);
        assert!(log.exists());
    }

    #[test]
    fn test_build_filter_accepts_overrides() {
        let mut config = LoggingConfig::default();
        config
            .overrides
            .insert("stomp_heartbeat_core::heartbeat".to_string(), "debug".to_string());
        let filter = build_filter(&config);
        assert!(filter.to_string().contains("stomp_heartbeat_core::heartbeat=debug"));
    }
}
