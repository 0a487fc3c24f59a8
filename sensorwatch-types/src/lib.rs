//! # sensorwatch-types
//!
//! Shared vocabulary for sensorwatch. This crate defines the values that flow
//! between a transport, the alerting core and whatever presentation layer sits
//! on top of it.
//!
//! ## Contents
//!
//! - [`Reading`]: a snapshot of named numeric sensor values
//! - [`TransportStatus`], [`DeviceLiveness`], [`AlertEvent`]: the notifications
//!   a session emits, wrapped together as [`MonitorEvent`]
//! - [`ChannelConfig`], [`FieldBinding`]: per-channel settings that an external
//!   config layer loads and saves
//! - [`ControlCommand`]: start/stop requests published back to the device
//! - [`Transport`]: the contract a network adapter implements
//!
//! ## Features
//!
//! - `serde`: derive `Serialize`/`Deserialize` for the data types
//!
//! ## Example
//!
//! ```rust
//! use sensorwatch_types::{AlertEvent, MonitorEvent, Reading};
//!
//! let reading = Reading::new().with("X", 2.0).with("Y", 0.0);
//! assert_eq!(reading.get("X"), Some(2.0));
//!
//! let event = MonitorEvent::Alert(AlertEvent::cleared("Gyroscope"));
//! assert_eq!(event.to_string(), "Alert cleared: Gyroscope");
//! ```

mod alert;
mod config;
mod reading;
mod status;
mod transport;

pub use alert::*;
pub use config::*;
pub use reading::*;
pub use status::*;
pub use transport::*;
