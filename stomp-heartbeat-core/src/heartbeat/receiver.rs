//! Incoming traffic monitor

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{duration_millis, HeartbeatState};

/// Delay before the next receive check
///
/// Subtracts the time the previous check spent working so ticks stay on the
/// nominal period; falls back to a full interval when that work took an
/// interval or longer.
pub fn next_delay(interval: Duration, work: Duration) -> Duration {
    match interval.checked_sub(work) {
        Some(delay) if !delay.is_zero() => delay,
        _ => interval,
    }
}

/// Periodically checks that the peer has sent something recently enough
pub struct ReceiveMonitor {
    state: Arc<HeartbeatState>,
    connection_shutdown: CancellationToken,
}

impl ReceiveMonitor {
    pub fn new(state: Arc<HeartbeatState>, connection_shutdown: CancellationToken) -> Self {
        Self {
            state,
            connection_shutdown,
        }
    }

    /// Run until the receive or connection shutdown fires
    pub async fn run(self) {
        let Some(interval) = self.state.receive_interval() else {
            debug!("Heartbeat receive not negotiated");
            return;
        };
        info!(
            interval_ms = duration_millis(interval),
            tolerance = self.state.receive_tolerance(),
            "Heartbeat receive started"
        );

        let mut work = Duration::ZERO;
        loop {
            let delay = next_delay(interval, work);
            tokio::select! {
                biased;
                _ = self.state.receive_shutdown().cancelled() => break,
                _ = self.connection_shutdown.cancelled() => break,
                _ = time::sleep(delay) => {
                    let loop_start = Instant::now();
                    self.check(loop_start);
                    work = loop_start.elapsed();
                }
            }
        }

        info!(count = self.state.receive_count(), "Heartbeat receive ends");
    }

    fn check(&self, now: Instant) {
        let Some(check) = self.state.check_receive(now) else {
            return;
        };
        debug!(
            elapsed_ms = duration_millis(check.elapsed),
            threshold_ms = duration_millis(check.threshold),
            "Heartbeat receive tick"
        );
        if check.stale {
            warn!(
                elapsed_ms = duration_millis(check.elapsed),
                threshold_ms = duration_millis(check.threshold),
                "Heartbeat receive read is dirty"
            );
        }
    }
}
