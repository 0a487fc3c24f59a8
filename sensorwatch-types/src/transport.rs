//! The transport contract.
//!
//! A transport owns the network session (connect, subscribe, publish,
//! reconnect). It reports what happens on the wire through an
//! [`EventHandler`] supplied at connect time. The sensorwatch session
//! drives the lifecycle and decides what to do with each event.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Delivery guarantee requested for a subscribe or publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QoS {
    AtMostOnce,
    #[default]
    AtLeastOnce,
    ExactlyOnce,
}

/// Something the transport observed.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// An inbound message on a subscribed topic.
    Message { topic: String, payload: Vec<u8> },
    /// The connection dropped unexpectedly.
    Interrupted { reason: String },
    /// The transport restored the connection on its own.
    Resumed,
}

/// Callback a transport invokes for every [`TransportEvent`].
///
/// Handlers must not block; the transport may call them from its network task.
pub type EventHandler = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// Errors that can occur in transport operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    /// Subscribe did not complete in time.
    #[error("Subscribe timed out")]
    SubscribeTimeout,

    /// Reconnect did not complete in time.
    #[error("Reconnect timed out")]
    ReconnectTimeout,

    /// Publish was rejected.
    #[error("Publish failed: {0}")]
    Publish(String),

    /// The transport has been torn down.
    #[error("Transport closed")]
    Closed,
}

/// A network session the monitor runs over.
///
/// Implementations live in `sensorwatch-adapters`. All methods may take
/// arbitrarily long; callers apply their own timeouts.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Open the connection and start delivering events to `handler`.
    async fn connect(&self, handler: EventHandler) -> Result<(), TransportError>;

    /// Subscribe to a topic; messages arrive as [`TransportEvent::Message`].
    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), TransportError>;

    /// Try to restore an interrupted connection.
    async fn reconnect(&self) -> Result<(), TransportError>;

    /// Publish a payload to a topic.
    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS)
        -> Result<(), TransportError>;

    /// Close the connection and stop delivering events.
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Human-readable description of the endpoint, used in logs.
    fn description(&self) -> &str;
}
