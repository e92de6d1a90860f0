//! Shared heart-beat state for one connection

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::spec::HeartbeatPlan;

/// Default grace fraction applied on top of the receive interval
pub const DEFAULT_RECEIVE_TOLERANCE: f64 = 0.2;

/// Whole milliseconds in `d`, saturating at `u64::MAX`
pub fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Counter and advisory flag for one direction, guarded together
#[derive(Debug, Default)]
struct DirectionStats {
    count: u64,
    failed: bool,
}

/// Result of one receive-side liveness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveCheck {
    /// Time since the last frame arrived, measured at the tick
    pub elapsed: Duration,
    /// Largest gap tolerated before the connection is flagged
    pub threshold: Duration,
    pub stale: bool,
    pub count: u64,
}

/// Point-in-time view of the heart-beat state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatStatus {
    pub send_enabled: bool,
    pub receive_enabled: bool,
    pub send_interval_ms: Option<u64>,
    pub receive_interval_ms: Option<u64>,
    pub send_count: u64,
    pub receive_count: u64,
    pub send_failed: bool,
    pub receive_failed: bool,
    pub since_last_send_ms: u64,
    pub since_last_receive_ms: u64,
}

/// State shared by the send and receive monitors of one connection
///
/// Intervals and enabled flags are fixed at construction. Counters and
/// failure flags are only written by the owning monitor; everyone else reads.
/// Timestamps are stored as nanosecond offsets from `origin` so a read is a
/// single atomic load.
#[derive(Debug)]
pub struct HeartbeatState {
    origin: Instant,
    send_interval: Option<Duration>,
    receive_interval: Option<Duration>,
    receive_tolerance: f64,
    last_send: AtomicU64,
    last_receive: AtomicU64,
    send: Mutex<DirectionStats>,
    receive: Mutex<DirectionStats>,
    send_shutdown: CancellationToken,
    receive_shutdown: CancellationToken,
}

impl HeartbeatState {
    /// Create state for a negotiated plan, priming both timestamps to now
    pub fn new(plan: &HeartbeatPlan, receive_tolerance: f64) -> Self {
        Self {
            origin: Instant::now(),
            send_interval: plan.send_interval,
            receive_interval: plan.receive_interval,
            receive_tolerance,
            last_send: AtomicU64::new(0),
            last_receive: AtomicU64::new(0),
            send: Mutex::new(DirectionStats::default()),
            receive: Mutex::new(DirectionStats::default()),
            send_shutdown: CancellationToken::new(),
            receive_shutdown: CancellationToken::new(),
        }
    }

    fn offset(&self, at: Instant) -> u64 {
        u64::try_from(at.saturating_duration_since(self.origin).as_nanos()).unwrap_or(u64::MAX)
    }

    fn instant(&self, offset: u64) -> Instant {
        self.origin + Duration::from_nanos(offset)
    }

    pub fn send_enabled(&self) -> bool {
        self.send_interval.is_some()
    }

    pub fn receive_enabled(&self) -> bool {
        self.receive_interval.is_some()
    }

    pub fn send_interval(&self) -> Option<Duration> {
        self.send_interval
    }

    pub fn receive_interval(&self) -> Option<Duration> {
        self.receive_interval
    }

    pub fn receive_tolerance(&self) -> f64 {
        self.receive_tolerance
    }

    /// Longest silence accepted before the receive side is flagged
    ///
    /// A negative or NaN tolerance adds no grace; an overflowing one saturates.
    pub fn receive_threshold(&self) -> Option<Duration> {
        let tolerance = self.receive_tolerance;
        self.receive_interval.map(|interval| {
            let grace = Duration::try_from_secs_f64(interval.as_secs_f64() * tolerance)
                .unwrap_or(if tolerance > 0.0 { Duration::MAX } else { Duration::ZERO });
            interval.saturating_add(grace)
        })
    }

    /// Record that a frame of any kind arrived from the peer
    ///
    /// Called by the connection's reader. Later calls never move the
    /// timestamp backwards.
    pub fn mark_received(&self) {
        self.mark_received_at(Instant::now());
    }

    pub fn mark_received_at(&self, at: Instant) {
        self.last_receive.fetch_max(self.offset(at), Ordering::AcqRel);
    }

    pub fn last_receive(&self) -> Instant {
        self.instant(self.last_receive.load(Ordering::Acquire))
    }

    pub fn last_send(&self) -> Instant {
        self.instant(self.last_send.load(Ordering::Acquire))
    }

    pub fn send_count(&self) -> u64 {
        self.send.lock().count
    }

    pub fn receive_count(&self) -> u64 {
        self.receive.lock().count
    }

    /// Advisory flag: the most recent heart-beat write failed
    pub fn send_failed(&self) -> bool {
        self.send.lock().failed
    }

    /// Advisory flag: the peer has been silent for longer than tolerated
    pub fn receive_failed(&self) -> bool {
        self.receive.lock().failed
    }

    pub fn send_shutdown(&self) -> &CancellationToken {
        &self.send_shutdown
    }

    pub fn receive_shutdown(&self) -> &CancellationToken {
        &self.receive_shutdown
    }

    /// Apply the outcome of one heart-beat write; returns the send count
    pub(crate) fn record_send(&self, succeeded: bool, at: Instant) -> u64 {
        let mut stats = self.send.lock();
        if succeeded {
            stats.failed = false;
            stats.count += 1;
            self.last_send.fetch_max(self.offset(at), Ordering::AcqRel);
        } else {
            stats.failed = true;
        }
        stats.count
    }

    /// Flag the send side without touching the counter
    pub(crate) fn mark_send_failed(&self) {
        self.send.lock().failed = true;
    }

    /// Compare the last receive time against the tolerated window at `now`
    pub(crate) fn check_receive(&self, now: Instant) -> Option<ReceiveCheck> {
        let threshold = self.receive_threshold()?;
        let mut stats = self.receive.lock();
        let elapsed = now.saturating_duration_since(self.last_receive());
        let stale = elapsed > threshold;
        if stale {
            stats.failed = true;
        } else {
            stats.failed = false;
            stats.count += 1;
        }
        Some(ReceiveCheck {
            elapsed,
            threshold,
            stale,
            count: stats.count,
        })
    }

    pub fn status(&self) -> HeartbeatStatus {
        let now = Instant::now();
        let (send_count, send_failed) = {
            let stats = self.send.lock();
            (stats.count, stats.failed)
        };
        let (receive_count, receive_failed) = {
            let stats = self.receive.lock();
            (stats.count, stats.failed)
        };
        HeartbeatStatus {
            send_enabled: self.send_enabled(),
            receive_enabled: self.receive_enabled(),
            send_interval_ms: self.send_interval.map(duration_millis),
            receive_interval_ms: self.receive_interval.map(duration_millis),
            send_count,
            receive_count,
            send_failed,
            receive_failed,
            since_last_send_ms: duration_millis(now.saturating_duration_since(self.last_send())),
            since_last_receive_ms: duration_millis(
                now.saturating_duration_since(self.last_receive()),
            ),
        }
    }
}
