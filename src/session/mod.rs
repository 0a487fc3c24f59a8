//! Transport session lifecycle.
//!
//! A [`TransportSession`] owns one [`Transport`] and drives it through
//! connect, subscribe, reconnect and disconnect. Inbound messages are
//! handled synchronously inside the transport's callback: the liveness
//! clock is reset, the payload is decoded and every channel of the
//! [`AlertEngine`] evaluates it. Interruptions and resumptions go to a
//! supervisor task so the bounded reconnect never blocks message delivery.
//!
//! ```text
//!                 connect()                ok
//!  Disconnected ────────────► Connecting ──────► Connected
//!       ▲                         │                │   ▲
//!       │          failed         │   interrupted  │   │ reconnect ok / resumed
//!       ├─────────────────────────┘                ▼   │
//!       │                                        Reconnecting
//!       │          disconnect() from any state        │
//!       └─────────────────────────────────────────────┘
//! ```

mod decode;

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use sensorwatch_types::{
    ControlCommand, DeviceLiveness, EventHandler, QoS, Transport, TransportError, TransportEvent,
    TransportStatus,
};
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::alert::AlertEngine;
use crate::events::{emit, event_channel, EventReceiver, EventSender};
use crate::liveness::{LivenessMonitor, TickerHandle};

pub use decode::decode_payload;

/// Bound on the initial connect.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Bound on the topic subscription.
pub const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Bound on each reconnect attempt after an interruption.
pub const RECONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound on an outbound publish.
pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// Topic that control commands are published to unless configured.
pub const DEFAULT_CONTROL_TOPIC: &str = "device/control";

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Topics and delivery guarantee used by a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Topic carrying device readings.
    pub topic: String,
    /// Topic for start/stop commands.
    pub control_topic: String,
    /// Delivery guarantee requested for the subscription.
    pub qos: QoS,
}

impl SessionConfig {
    /// Create a new config for the given data topic.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            control_topic: DEFAULT_CONTROL_TOPIC.to_string(),
            qos: QoS::AtLeastOnce,
        }
    }

    pub fn control_topic(mut self, topic: impl Into<String>) -> Self {
        self.control_topic = topic.into();
        self
    }

    pub fn qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }
}

/// Background work that exists only while connected.
struct Running {
    stop_tx: watch::Sender<bool>,
    supervisor: JoinHandle<()>,
    ticker: TickerHandle,
}

impl Running {
    async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.supervisor.await;
        self.ticker.stop().await;
    }
}

struct Shared {
    transport: Arc<dyn Transport>,
    engine: Arc<AlertEngine>,
    liveness: Arc<LivenessMonitor>,
    config: SessionConfig,
    events: EventSender,
    state: Mutex<SessionState>,
    running: Mutex<Option<Running>>,
}

impl Shared {
    /// Move from `from` to `to`; false if the session was not in `from`.
    fn transition(&self, from: SessionState, to: SessionState) -> bool {
        let mut state = self.state.lock();
        if *state != from {
            return false;
        }
        *state = to;
        true
    }

    fn on_message(&self, topic: &str, payload: &[u8]) {
        if *self.state.lock() == SessionState::Disconnected {
            trace!("Dropping message on {} after disconnect", topic);
            return;
        }

        // Any arrival counts for liveness, decodable or not.
        self.liveness.record_message();

        let reading = match decode_payload(payload) {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Dropping message on {}: {}", topic, e);
                return;
            }
        };
        trace!("Reading on {}: {:?}", topic, reading);

        for alert in self.engine.evaluate(&reading) {
            emit(&self.events, alert);
        }
    }

    async fn on_interrupted(&self, reason: &str) {
        if !self.transition(SessionState::Connected, SessionState::Reconnecting) {
            debug!("Ignoring interruption while {:?}", *self.state.lock());
            return;
        }
        warn!("Connection interrupted: {}", reason);
        emit(&self.events, TransportStatus::Disconnected);
        self.liveness.mark_unknown();

        let result = match timeout(RECONNECT_TIMEOUT, self.transport.reconnect()).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::ReconnectTimeout),
        };
        match result {
            Ok(()) => self.on_resumed(),
            Err(e) => {
                warn!("Reconnect failed: {}", e);
                emit(&self.events, TransportStatus::ReconnectFailed);
                self.liveness.mark_offline();
            }
        }
    }

    fn on_resumed(&self) {
        if self.transition(SessionState::Reconnecting, SessionState::Connected) {
            info!("Reconnected to {}", self.transport.description());
            emit(&self.events, TransportStatus::Reconnected);
        } else {
            debug!("Ignoring resume while {:?}", *self.state.lock());
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            let _ = running.stop_tx.send(true);
            running.supervisor.abort();
        }
    }
}

/// Build the callback handed to the transport.
///
/// Messages are handled in place; lifecycle events are queued for the
/// supervisor.
fn event_handler(
    shared: Weak<Shared>,
    lifecycle: mpsc::UnboundedSender<TransportEvent>,
) -> EventHandler {
    Arc::new(move |event| match event {
        TransportEvent::Message { topic, payload } => {
            if let Some(shared) = shared.upgrade() {
                shared.on_message(&topic, &payload);
            }
        }
        other => {
            if lifecycle.send(other).is_err() {
                trace!("Lifecycle event after supervisor exit");
            }
        }
    })
}

async fn supervise(
    shared: Weak<Shared>,
    mut lifecycle: mpsc::UnboundedReceiver<TransportEvent>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            event = lifecycle.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        let Some(shared) = shared.upgrade() else {
            break;
        };

        match event {
            TransportEvent::Interrupted { reason } => {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = shared.on_interrupted(&reason) => {}
                }
            }
            TransportEvent::Resumed => shared.on_resumed(),
            TransportEvent::Message { .. } => {}
        }
    }
    debug!("Session supervisor stopped");
}

/// A connection to one device topic, feeding an [`AlertEngine`].
///
/// Cloning yields another handle to the same session.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use sensorwatch::alert::{AlertEngine, Channel};
/// use sensorwatch::session::{SessionConfig, TransportSession};
/// use sensorwatch_adapters::ChannelTransport;
///
/// # tokio_test::block_on(async {
/// let transport = ChannelTransport::new("demo");
/// let engine = Arc::new(AlertEngine::new([Channel::new("Light", ["L"])]));
/// let (session, mut events) =
///     TransportSession::new(Arc::new(transport.clone()), engine, SessionConfig::new("sensors/data"));
///
/// session.connect().await.unwrap();
/// transport.deliver("sensors/data", br#"{"L": 12}"#.to_vec());
/// session.disconnect().await;
/// # });
/// ```
#[derive(Clone)]
pub struct TransportSession {
    shared: Arc<Shared>,
}

impl TransportSession {
    /// Create a new session and the receiver for its notifications.
    pub fn new(
        transport: Arc<dyn Transport>,
        engine: Arc<AlertEngine>,
        config: SessionConfig,
    ) -> (Self, EventReceiver) {
        let (events, receiver) = event_channel();
        let shared = Arc::new(Shared {
            transport,
            engine,
            liveness: Arc::new(LivenessMonitor::new(events.clone())),
            config,
            events,
            state: Mutex::new(SessionState::Disconnected),
            running: Mutex::new(None),
        });
        (Self { shared }, receiver)
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.lock()
    }

    pub fn device_status(&self) -> DeviceLiveness {
        self.shared.liveness.status()
    }

    pub fn engine(&self) -> &Arc<AlertEngine> {
        &self.shared.engine
    }

    pub fn liveness(&self) -> &Arc<LivenessMonitor> {
        &self.shared.liveness
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn transport_description(&self) -> &str {
        self.shared.transport.description()
    }

    /// Connect, start the liveness watchdog and subscribe.
    ///
    /// A failed or timed-out subscription is reported as
    /// [`TransportStatus::SubscribeFailed`] but does not fail the connect.
    /// Calling this on a session that is not disconnected does nothing.
    pub async fn connect(&self) -> Result<(), TransportError> {
        let shared = &self.shared;
        if !shared.transition(SessionState::Disconnected, SessionState::Connecting) {
            debug!("Connect ignored while {:?}", self.state());
            return Ok(());
        }
        info!("Connecting to {}", shared.transport.description());
        emit(&shared.events, TransportStatus::Connecting);

        let (lifecycle_tx, lifecycle_rx) = mpsc::unbounded_channel();
        let handler = event_handler(Arc::downgrade(shared), lifecycle_tx);

        let result = match timeout(CONNECT_TIMEOUT, shared.transport.connect(handler)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::ConnectFailed(format!(
                "no answer within {}s",
                CONNECT_TIMEOUT.as_secs()
            ))),
        };
        if let Err(e) = result {
            warn!("Connect to {} failed: {}", shared.transport.description(), e);
            if shared.transition(SessionState::Connecting, SessionState::Disconnected) {
                emit(&shared.events, TransportStatus::Disconnected);
            }
            return Err(e);
        }

        // The running lock is held across the transition and the install so
        // a concurrent disconnect either sees Connecting or takes the tasks.
        let connected = {
            let mut running = shared.running.lock();
            let connected = shared.transition(SessionState::Connecting, SessionState::Connected);
            if connected {
                info!("Connected to {}", shared.transport.description());
                emit(&shared.events, TransportStatus::Connected);

                shared.liveness.reset();
                let (stop_tx, stop_rx) = watch::channel(false);
                *running = Some(Running {
                    stop_tx,
                    supervisor: tokio::spawn(supervise(
                        Arc::downgrade(shared),
                        lifecycle_rx,
                        stop_rx,
                    )),
                    ticker: shared.liveness.start(),
                });
            }
            connected
        };
        if !connected {
            debug!("Session torn down while connecting");
            if let Err(e) = shared.transport.disconnect().await {
                warn!("Transport disconnect failed: {}", e);
            }
            return Err(TransportError::Closed);
        }

        self.subscribe().await;
        Ok(())
    }

    async fn subscribe(&self) {
        let shared = &self.shared;
        let topic = shared.config.topic.as_str();
        let result = match timeout(
            SUBSCRIBE_TIMEOUT,
            shared.transport.subscribe(topic, shared.config.qos),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::SubscribeTimeout),
        };

        match result {
            Ok(()) => info!("Subscribed to {}", topic),
            Err(e) => {
                warn!("Subscribe to {} failed: {}", topic, e);
                if self.state() != SessionState::Disconnected {
                    emit(&shared.events, TransportStatus::SubscribeFailed);
                }
            }
        }
    }

    /// Stop background work and release the transport.
    ///
    /// Safe to call in any state and more than once. Once this returns no
    /// liveness tick or reconnect attempt will run.
    pub async fn disconnect(&self) {
        let shared = &self.shared;
        let previous = std::mem::replace(&mut *shared.state.lock(), SessionState::Disconnected);

        let running = shared.running.lock().take();
        if let Some(running) = running {
            running.stop().await;
        }

        if previous == SessionState::Disconnected {
            debug!("Disconnect ignored, already disconnected");
            return;
        }

        if let Err(e) = shared.transport.disconnect().await {
            warn!("Transport disconnect failed: {}", e);
        }
        info!("Disconnected from {}", shared.transport.description());
        emit(&shared.events, TransportStatus::Disconnected);
    }

    /// Publish a raw payload through the transport.
    pub async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QoS,
    ) -> Result<(), TransportError> {
        if self.state() == SessionState::Disconnected {
            return Err(TransportError::Closed);
        }
        match timeout(
            PUBLISH_TIMEOUT,
            self.shared.transport.publish(topic, payload, qos),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Publish(format!(
                "no answer within {}s",
                PUBLISH_TIMEOUT.as_secs()
            ))),
        }
    }

    /// Ask the device to start or stop producing data.
    pub async fn send_control(&self, command: ControlCommand) -> Result<(), TransportError> {
        let topic = self.shared.config.control_topic.as_str();
        info!("Sending {} to {}", command, topic);
        let payload = serde_json::to_vec(&json!({ "action": command }))
            .map_err(|e| TransportError::Publish(e.to_string()))?;
        self.publish(topic, payload, QoS::AtLeastOnce).await
    }
}

impl std::fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSession")
            .field("transport", &self.shared.transport.description())
            .field("topic", &self.shared.config.topic)
            .field("state", &self.state())
            .finish()
    }
}
