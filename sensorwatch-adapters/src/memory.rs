//! In-memory transport.
//!
//! Delivers messages pushed by the owning code straight into the session's
//! event handler. The outcome of each lifecycle call can be scripted, which
//! makes this the transport of choice for tests and local demos.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use sensorwatch_types::{EventHandler, QoS, Transport, TransportError, TransportEvent};

/// Scripted outcome for a lifecycle call.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Behavior {
    /// Complete immediately with success.
    #[default]
    Succeed,
    /// Complete immediately with the given error.
    Fail(TransportError),
    /// Never complete; the caller's timeout decides.
    Hang,
}

impl Behavior {
    async fn run(&self) -> Result<(), TransportError> {
        match self {
            Behavior::Succeed => Ok(()),
            Behavior::Fail(err) => Err(err.clone()),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

/// A message recorded by [`ChannelTransport::publish`].
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
}

#[derive(Debug, Default)]
struct ScriptState {
    connected: bool,
    subscriptions: Vec<String>,
    published: Vec<Published>,
    connect: Behavior,
    subscribe: Behavior,
    reconnect: Behavior,
    connect_calls: usize,
    reconnect_calls: usize,
    disconnect_calls: usize,
}

struct Inner {
    description: String,
    handler: Mutex<Option<EventHandler>>,
    state: Mutex<ScriptState>,
}

/// A transport backed by in-process calls.
///
/// Cloning yields another handle to the same transport, so a test can keep
/// one handle to drive the wire while the session owns the other.
///
/// # Example
///
/// ```rust
/// use sensorwatch_adapters::ChannelTransport;
///
/// let transport = ChannelTransport::new("memory://test");
/// // Nothing is delivered until a session has connected.
/// assert!(!transport.deliver("sensors/data", br#"{"light":12}"#.to_vec()));
/// ```
#[derive(Clone)]
pub struct ChannelTransport {
    inner: Arc<Inner>,
}

impl ChannelTransport {
    /// Create a transport that succeeds at everything.
    pub fn new(description: &str) -> Self {
        Self {
            inner: Arc::new(Inner {
                description: format!("memory: {}", description),
                handler: Mutex::new(None),
                state: Mutex::new(ScriptState::default()),
            }),
        }
    }

    /// Script the outcome of subsequent `connect` calls.
    pub fn set_connect_behavior(&self, behavior: Behavior) {
        self.inner.state.lock().connect = behavior;
    }

    /// Script the outcome of subsequent `subscribe` calls.
    pub fn set_subscribe_behavior(&self, behavior: Behavior) {
        self.inner.state.lock().subscribe = behavior;
    }

    /// Script the outcome of subsequent `reconnect` calls.
    pub fn set_reconnect_behavior(&self, behavior: Behavior) {
        self.inner.state.lock().reconnect = behavior;
    }

    /// Deliver an inbound message, as if it arrived from the network.
    ///
    /// Returns `false` if the transport is not connected; the message is dropped.
    pub fn deliver(&self, topic: &str, payload: Vec<u8>) -> bool {
        if !self.inner.state.lock().connected {
            return false;
        }
        self.emit(TransportEvent::Message {
            topic: topic.to_string(),
            payload,
        })
    }

    /// Simulate an unexpected connection loss.
    pub fn interrupt(&self, reason: &str) -> bool {
        self.inner.state.lock().connected = false;
        self.emit(TransportEvent::Interrupted {
            reason: reason.to_string(),
        })
    }

    /// Simulate the transport restoring the connection by itself.
    pub fn resume(&self) -> bool {
        self.inner.state.lock().connected = true;
        self.emit(TransportEvent::Resumed)
    }

    /// Messages published so far.
    pub fn published(&self) -> Vec<Published> {
        self.inner.state.lock().published.clone()
    }

    /// Topics subscribed so far.
    pub fn subscriptions(&self) -> Vec<String> {
        self.inner.state.lock().subscriptions.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().connected
    }

    pub fn connect_calls(&self) -> usize {
        self.inner.state.lock().connect_calls
    }

    pub fn reconnect_calls(&self) -> usize {
        self.inner.state.lock().reconnect_calls
    }

    pub fn disconnect_calls(&self) -> usize {
        self.inner.state.lock().disconnect_calls
    }

    fn emit(&self, event: TransportEvent) -> bool {
        // Clone the handler out so it runs without our lock held.
        let handler = self.inner.handler.lock().clone();
        match handler {
            Some(handler) => {
                handler(event);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for ChannelTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelTransport")
            .field("description", &self.inner.description)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn connect(&self, handler: EventHandler) -> Result<(), TransportError> {
        let behavior = {
            let mut state = self.inner.state.lock();
            state.connect_calls += 1;
            state.connect.clone()
        };
        behavior.run().await?;

        *self.inner.handler.lock() = Some(handler);
        self.inner.state.lock().connected = true;
        debug!("{} connected", self.inner.description);
        Ok(())
    }

    async fn subscribe(&self, topic: &str, _qos: QoS) -> Result<(), TransportError> {
        let behavior = self.inner.state.lock().subscribe.clone();
        behavior.run().await?;
        self.inner.state.lock().subscriptions.push(topic.to_string());
        Ok(())
    }

    async fn reconnect(&self) -> Result<(), TransportError> {
        let behavior = {
            let mut state = self.inner.state.lock();
            state.reconnect_calls += 1;
            state.reconnect.clone()
        };
        behavior.run().await?;
        self.inner.state.lock().connected = true;
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QoS,
    ) -> Result<(), TransportError> {
        let mut state = self.inner.state.lock();
        if !state.connected {
            return Err(TransportError::Closed);
        }
        state.published.push(Published {
            topic: topic.to_string(),
            payload,
            qos,
        });
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.inner.handler.lock().take();
        let mut state = self.inner.state.lock();
        state.connected = false;
        state.disconnect_calls += 1;
        Ok(())
    }

    fn description(&self) -> &str {
        &self.inner.description
    }
}
