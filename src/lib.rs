//! # sensorwatch
//!
//! Threshold alerting and device liveness for IoT sensor streams.
//!
//! A device publishes readings (gyroscope, temperature, humidity, light) on
//! a topic. This crate connects to that topic, keeps the connection alive,
//! infers whether the device is actually sending data, and turns each
//! channel's user-supplied threshold expression into debounced alert and
//! clear notifications.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                       TransportSession                        │
//! │                                                               │
//! │  Transport ──message──▶ liveness ──▶ decode ──▶ AlertEngine   │
//! │      │                  (watchdog)              │             │
//! │      │                                          ▼             │
//! │      └─interrupted/resumed─▶ supervisor    Channel × N        │
//! │                              (reconnect)   expr ─▶ debounce   │
//! │                                                 │             │
//! └─────────────────────────────────────────────────┼─────────────┘
//!                                                   ▼
//!                              MonitorEvent stream (status, alerts)
//! ```
//!
//! - **[`expr`]**: Tokenizer and compiler for threshold expressions such as
//!   `T>50 and H>80`, and the [`Predicate`](expr::Predicate) they compile to
//! - **[`alert`]**: Per-channel hysteresis ([`AlertDebouncer`]) and the
//!   [`AlertEngine`] that owns every channel
//! - **[`liveness`]**: Watchdog marking the device online or offline from
//!   message arrival times
//! - **[`session`]**: Connect/subscribe/reconnect lifecycle over any
//!   [`Transport`](sensorwatch_types::Transport)
//! - **[`settings`]**: Layered configuration for the binary
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Watch the default topic on a local NATS server
//! sensorwatch
//!
//! # Use a settings file and ask the device to start sending
//! sensorwatch --config sensorwatch.toml --control start
//! ```
//!
//! ### As a library
//!
//! ```
//! use std::sync::Arc;
//! use sensorwatch::{AlertEngine, Channel, SessionConfig, TransportSession};
//! use sensorwatch_adapters::ChannelTransport;
//!
//! let engine = AlertEngine::new([Channel::new("Gyroscope", ["X", "Y", "Z"])]);
//! engine.set_threshold("Gyroscope", "X>1.0 or Y>1.5").unwrap();
//!
//! let transport = Arc::new(ChannelTransport::new("bench"));
//! let (session, events) =
//!     TransportSession::new(transport, Arc::new(engine), SessionConfig::new("sensors/data"));
//! ```

pub mod alert;
pub mod error;
pub mod events;
pub mod expr;
pub mod liveness;
pub mod session;
pub mod settings;

// Re-export main types for convenience
pub use alert::{AlertDebouncer, AlertEngine, AlertState, Channel, DebounceState};
pub use error::{CompileError, ConfigError, DecodeError, EvalError};
pub use events::{event_channel, EventReceiver, EventSender};
pub use expr::{compile, Predicate};
pub use liveness::LivenessMonitor;
pub use session::{decode_payload, SessionConfig, SessionState, TransportSession};
pub use settings::Settings;

pub use sensorwatch_types::{
    AlertEvent, ChannelConfig, ControlCommand, DeviceLiveness, MonitorEvent, Reading,
    TransportStatus,
};
