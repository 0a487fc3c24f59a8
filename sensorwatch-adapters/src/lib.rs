//! # sensorwatch-adapters
//!
//! Ready-made [`Transport`](sensorwatch_types::Transport) implementations for
//! running a sensorwatch session.
//!
//! ## Supported Transports
//!
//! - **In-memory** (always built) - [`ChannelTransport`] delivers messages
//!   pushed by the owning code and lets tests script connect, subscribe and
//!   reconnect outcomes
//! - **NATS** (`nats` feature) - [`nats::NatsTransport`] subscribes to a
//!   subject on a NATS server and publishes control commands back
//!
//! ## Quick Start (in-memory)
//!
//! ```rust
//! use sensorwatch_adapters::{Behavior, ChannelTransport};
//! use sensorwatch_types::TransportError;
//!
//! let transport = ChannelTransport::new("bench");
//! transport.set_reconnect_behavior(Behavior::Fail(TransportError::ReconnectTimeout));
//! ```

pub mod memory;

#[cfg(feature = "nats")]
pub mod nats;

pub use memory::{Behavior, ChannelTransport, Published};

// Re-export the contract for convenience
pub use sensorwatch_types::{EventHandler, QoS, Transport, TransportError, TransportEvent};
