//! Outgoing heart-beat monitor

use std::sync::Arc;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{duration_millis, HeartbeatState};
use crate::error::Error;
use crate::frame::Frame;
use crate::wire::SharedFrameWriter;

/// Periodically writes heart-beat frames and tracks whether writes succeed
pub struct SendMonitor {
    state: Arc<HeartbeatState>,
    writer: SharedFrameWriter,
    connection_shutdown: CancellationToken,
}

impl SendMonitor {
    pub fn new(
        state: Arc<HeartbeatState>,
        writer: SharedFrameWriter,
        connection_shutdown: CancellationToken,
    ) -> Self {
        Self {
            state,
            writer,
            connection_shutdown,
        }
    }

    /// Run until the send or connection shutdown fires
    pub async fn run(self) {
        let Some(period) = self.state.send_interval() else {
            debug!("Heartbeat send not negotiated");
            return;
        };

        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = duration_millis(period), "Heartbeat send started");

        loop {
            tokio::select! {
                biased;
                _ = self.state.send_shutdown().cancelled() => break,
                _ = self.connection_shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if !self.beat().await {
                        break;
                    }
                }
            }
        }

        info!(count = self.state.send_count(), "Heartbeat send ends");
    }

    /// Write one heart-beat; false when the writer is gone for good
    async fn beat(&self) -> bool {
        debug!("Heartbeat send data");
        match self.writer.write_frame(Frame::heartbeat()).await {
            Ok(()) => {
                self.state.record_send(true, Instant::now());
                true
            }
            Err(Error::WriterClosed) => {
                warn!("Heartbeat send failure: frame writer closed");
                self.state.mark_send_failed();
                false
            }
            Err(e) => {
                warn!(error = %e, "Heartbeat send failure");
                self.state.record_send(false, Instant::now());
                true
            }
        }
    }
}
