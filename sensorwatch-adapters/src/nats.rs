//! NATS transport.
//!
//! Runs a sensorwatch session over a NATS server. The device topic is used
//! as a NATS subject, so `sensors/data` style names should be configured as
//! dotted subjects (`sensors.data`) on the NATS side.
//!
//! The client reconnects on its own; interruption and resumption are
//! reported through the event handler from the connection event callback.
//! NATS core delivery is at-most-once, so the requested [`QoS`] is accepted
//! but not enforced.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sensorwatch_adapters::nats::NatsTransport;
//!
//! let transport = NatsTransport::builder()
//!     .url("nats://localhost:4222")
//!     .build();
//! ```

use std::sync::Arc;

use async_nats::{Client, ConnectOptions, Event};
use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use sensorwatch_types::{EventHandler, QoS, Transport, TransportError, TransportEvent};

/// A [`Transport`] backed by an `async-nats` client.
pub struct NatsTransport {
    url: String,
    description: String,
    client_name: Option<String>,
    client: Mutex<Option<Client>>,
    handler: Arc<Mutex<Option<EventHandler>>>,
    readers: Mutex<Vec<JoinHandle<()>>>,
}

impl NatsTransport {
    /// Create a new builder for configuring the transport.
    pub fn builder() -> NatsTransportBuilder {
        NatsTransportBuilder::default()
    }

    fn client(&self) -> Result<Client, TransportError> {
        self.client.lock().clone().ok_or(TransportError::Closed)
    }
}

impl std::fmt::Debug for NatsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsTransport").field("url", &self.url).finish()
    }
}

#[async_trait]
impl Transport for NatsTransport {
    async fn connect(&self, handler: EventHandler) -> Result<(), TransportError> {
        // The callback reads the shared slot so it goes quiet once
        // `disconnect` clears it.
        let slot = Arc::clone(&self.handler);
        let mut options = ConnectOptions::new().event_callback(move |event| {
            let events = slot.lock().clone();
            async move {
                let Some(events) = events else {
                    debug!("NATS event after disconnect: {:?}", event);
                    return;
                };
                match event {
                    Event::Disconnected => events(TransportEvent::Interrupted {
                        reason: "disconnected from server".to_string(),
                    }),
                    Event::Connected => events(TransportEvent::Resumed),
                    other => debug!("NATS event: {:?}", other),
                }
            }
        });
        if let Some(name) = &self.client_name {
            options = options.name(name.clone());
        }

        let client = options
            .connect(self.url.as_str())
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        info!("Connected to {}", self.url);
        *self.handler.lock() = Some(handler);
        *self.client.lock() = Some(client);
        Ok(())
    }

    async fn subscribe(&self, topic: &str, _qos: QoS) -> Result<(), TransportError> {
        let client = self.client()?;
        let handler = self.handler.lock().clone().ok_or(TransportError::Closed)?;

        let mut subscriber = client
            .subscribe(topic.to_string())
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        let reader = tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                handler(TransportEvent::Message {
                    topic: message.subject.to_string(),
                    payload: message.payload.to_vec(),
                });
            }
            debug!("NATS subscription ended");
        });
        self.readers.lock().push(reader);
        Ok(())
    }

    async fn reconnect(&self) -> Result<(), TransportError> {
        // The client retries in the background; a successful flush means
        // the connection is back.
        let client = self.client()?;
        client
            .flush()
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))
    }

    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        _qos: QoS,
    ) -> Result<(), TransportError> {
        let client = self.client()?;
        client
            .publish(topic.to_string(), payload.into())
            .await
            .map_err(|e| TransportError::Publish(e.to_string()))?;
        client
            .flush()
            .await
            .map_err(|e| TransportError::Publish(e.to_string()))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        for reader in self.readers.lock().drain(..) {
            reader.abort();
        }
        self.handler.lock().take();

        let client = self.client.lock().take();
        if let Some(client) = client {
            if let Err(e) = client.drain().await {
                warn!("Drain on disconnect failed: {}", e);
            }
        }
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for NatsTransport.
#[derive(Debug, Default)]
pub struct NatsTransportBuilder {
    url: Option<String>,
    client_name: Option<String>,
}

impl NatsTransportBuilder {
    /// Set the NATS server URL (default: "nats://localhost:4222").
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the client name reported to the server.
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    /// Build the transport. No connection is made until `connect`.
    pub fn build(self) -> NatsTransport {
        let url = self
            .url
            .unwrap_or_else(|| "nats://localhost:4222".to_string());

        NatsTransport {
            description: format!("nats: {}", url),
            url,
            client_name: self.client_name,
            client: Mutex::new(None),
            handler: Arc::new(Mutex::new(None)),
            readers: Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let transport = NatsTransport::builder().build();
        assert_eq!(transport.description(), "nats: nats://localhost:4222");
    }

    #[test]
    fn test_builder_url() {
        let builder = NatsTransport::builder().url("nats://broker:4222");
        assert_eq!(builder.url.as_deref(), Some("nats://broker:4222"));
    }

    #[tokio::test]
    async fn test_publish_before_connect_is_closed() {
        let transport = NatsTransport::builder().build();
        let result = transport.publish("device.control", vec![], QoS::AtLeastOnce).await;
        assert_eq!(result, Err(TransportError::Closed));
    }

    #[tokio::test]
    async fn test_disconnect_releases_handler() {
        let transport = NatsTransport::builder().build();
        let handler: EventHandler = Arc::new(|_event: TransportEvent| {});
        *transport.handler.lock() = Some(Arc::clone(&handler));

        transport.disconnect().await.unwrap();
        assert!(transport.handler.lock().is_none());
        assert_eq!(Arc::strong_count(&handler), 1);
    }
}
