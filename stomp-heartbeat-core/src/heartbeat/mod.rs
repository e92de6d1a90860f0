//! Heart-beat negotiation and connection liveness monitors
//!
//! After CONNECT/CONNECTED, [`Negotiator::start`] reconciles both sides'
//! `heart-beat` headers and spawns a [`SendMonitor`] and/or
//! [`ReceiveMonitor`]. The monitors only ever report through the advisory
//! flags on [`HeartbeatState`]; deciding what to do about a failing
//! connection is left to the caller.

pub mod negotiator;
pub mod receiver;
pub mod sender;
pub mod spec;
pub mod state;

pub use negotiator::{Heartbeat, Negotiator};
pub use receiver::ReceiveMonitor;
pub use sender::SendMonitor;
pub use spec::{
    negotiate, HeaderField, HeaderSide, HeartbeatHeader, HeartbeatPlan, Negotiation,
    HEART_BEAT_DISABLED, HEART_BEAT_HEADER,
};
pub use state::{duration_millis, HeartbeatState, HeartbeatStatus, ReceiveCheck, DEFAULT_RECEIVE_TOLERANCE};
