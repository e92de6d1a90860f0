//! Heart-beat negotiation and liveness monitoring for STOMP clients
//!
//! This crate provides the pieces a STOMP connection needs to agree on
//! heart-beat intervals with a broker and to watch both directions of the
//! connection afterwards.

pub mod config;
pub mod error;
pub mod frame;
pub mod heartbeat;
pub mod logging;
pub mod wire;

pub use error::{Error, Result};
pub use frame::Frame;
pub use heartbeat::{Heartbeat, HeartbeatState, Negotiation, Negotiator};
pub use wire::{FrameWriter, SharedFrameWriter, WireWriter};
