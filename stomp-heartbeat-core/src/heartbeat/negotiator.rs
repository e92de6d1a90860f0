//! Negotiation and monitor start-up

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::receiver::ReceiveMonitor;
use super::sender::SendMonitor;
use super::spec::{negotiate, HeartbeatPlan, Negotiation};
use super::state::{HeartbeatState, HeartbeatStatus, DEFAULT_RECEIVE_TOLERANCE};
use crate::config::validate::{is_valid_receive_tolerance, MAX_RECEIVE_TOLERANCE};
use crate::config::HeartbeatConfig;
use crate::error::{Error, Result};
use crate::wire::SharedFrameWriter;

/// Turns a pair of heart-beat headers into running monitors
#[derive(Debug, Clone)]
pub struct Negotiator {
    receive_tolerance: f64,
}

impl Negotiator {
    pub fn new() -> Self {
        Self {
            receive_tolerance: DEFAULT_RECEIVE_TOLERANCE,
        }
    }

    /// Use a custom grace fraction for the receive check
    ///
    /// The fraction must be finite and within `[0, MAX_RECEIVE_TOLERANCE]`.
    pub fn with_tolerance(receive_tolerance: f64) -> Result<Self> {
        if !is_valid_receive_tolerance(receive_tolerance) {
            return Err(Error::Validation(format!(
                "receive tolerance must be in [0.0, {}], got {}",
                MAX_RECEIVE_TOLERANCE, receive_tolerance
            )));
        }
        Ok(Self { receive_tolerance })
    }

    pub fn from_config(config: &HeartbeatConfig) -> Result<Self> {
        Self::with_tolerance(config.receive_tolerance)
    }

    /// Negotiate and, when any direction is enabled, spawn its monitor
    ///
    /// Returns `Ok(None)` when heart-beating is disabled. A malformed header
    /// fails before any state is built or task spawned. Must be called from
    /// within a tokio runtime.
    pub fn start(
        &self,
        client: Option<&str>,
        server: Option<&str>,
        writer: SharedFrameWriter,
        connection_shutdown: CancellationToken,
    ) -> Result<Option<Heartbeat>> {
        match negotiate(client, server)? {
            Negotiation::Disabled => {
                debug!(?client, ?server, "Heartbeat disabled");
                Ok(None)
            }
            Negotiation::Enabled(plan) => {
                Ok(Some(self.launch(plan, writer, connection_shutdown)))
            }
        }
    }

    /// Spawn monitors for an already negotiated plan
    pub fn launch(
        &self,
        plan: HeartbeatPlan,
        writer: SharedFrameWriter,
        connection_shutdown: CancellationToken,
    ) -> Heartbeat {
        let state = Arc::new(HeartbeatState::new(&plan, self.receive_tolerance));

        let send_task = plan.send_enabled().then(|| {
            let monitor = SendMonitor::new(Arc::clone(&state), writer, connection_shutdown.clone());
            tokio::spawn(monitor.run())
        });
        let receive_task = plan.receive_enabled().then(|| {
            let monitor = ReceiveMonitor::new(Arc::clone(&state), connection_shutdown.clone());
            tokio::spawn(monitor.run())
        });

        info!(
            client = %plan.client,
            server = %plan.server,
            send = plan.send_enabled(),
            receive = plan.receive_enabled(),
            "Heartbeat negotiated"
        );

        Heartbeat {
            plan,
            state,
            send_task,
            receive_task,
        }
    }
}

impl Default for Negotiator {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to the monitors of one connection
///
/// Dropping the handle leaves the monitors running; they stop on their own
/// shutdown signals or the connection-wide one.
pub struct Heartbeat {
    plan: HeartbeatPlan,
    state: Arc<HeartbeatState>,
    send_task: Option<JoinHandle<()>>,
    receive_task: Option<JoinHandle<()>>,
}

impl Heartbeat {
    pub fn plan(&self) -> &HeartbeatPlan {
        &self.plan
    }

    /// Shared state; hand this to the connection's reader for `mark_received`
    pub fn state(&self) -> Arc<HeartbeatState> {
        Arc::clone(&self.state)
    }

    pub fn send_failed(&self) -> bool {
        self.state.send_failed()
    }

    pub fn receive_failed(&self) -> bool {
        self.state.receive_failed()
    }

    pub fn status(&self) -> HeartbeatStatus {
        self.state.status()
    }

    pub fn stop_send(&self) {
        self.state.send_shutdown().cancel();
    }

    pub fn stop_receive(&self) {
        self.state.receive_shutdown().cancel();
    }

    /// Stop both directions
    pub fn stop(&self) {
        self.stop_send();
        self.stop_receive();
    }

    /// Whether every spawned monitor has exited
    pub fn is_finished(&self) -> bool {
        [&self.send_task, &self.receive_task]
            .into_iter()
            .flatten()
            .all(JoinHandle::is_finished)
    }

    /// Wait for the monitors to exit and return the final state
    pub async fn join(self) -> Arc<HeartbeatState> {
        let tasks = [self.send_task, self.receive_task].into_iter().flatten();
        for outcome in futures::future::join_all(tasks).await {
            if let Err(e) = outcome {
                warn!(error = %e, "Heartbeat monitor did not finish cleanly");
            }
        }
        self.state
    }
}
