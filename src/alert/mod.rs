//! Threshold alerting.
//!
//! Each [`Channel`] compiles its threshold into a predicate and feeds the
//! results through an [`AlertDebouncer`]. The [`AlertEngine`] owns the
//! fixed set of channels and evaluates every one of them per message.

mod channel;
mod debounce;

use std::collections::BTreeMap;

use parking_lot::Mutex;
use sensorwatch_types::{AlertEvent, ChannelConfig, Reading};
use tracing::debug;

use crate::error::ConfigError;

pub use channel::Channel;
pub use debounce::{
    AlertDebouncer, AlertState, DebounceState, Transition, BREACH_REQUIRED, RECOVERY_REQUIRED,
};

/// The set of channels monitored by a session.
///
/// Channels are fixed at construction. Each one sits behind its own lock,
/// so a threshold can be swapped from another task while messages are
/// being evaluated.
#[derive(Debug, Default)]
pub struct AlertEngine {
    channels: BTreeMap<String, Mutex<Channel>>,
}

impl AlertEngine {
    /// Create a new engine from a set of channels.
    pub fn new(channels: impl IntoIterator<Item = Channel>) -> Self {
        Self {
            channels: channels
                .into_iter()
                .map(|c| (c.name().to_string(), Mutex::new(c)))
                .collect(),
        }
    }

    /// Channel names in sorted order.
    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    fn channel(&self, name: &str) -> Result<&Mutex<Channel>, ConfigError> {
        self.channels
            .get(name)
            .ok_or_else(|| ConfigError::UnknownChannel(name.to_string()))
    }

    /// Apply a stored configuration to a channel. See [`Channel::apply_config`].
    pub fn apply_config(&self, name: &str, config: &ChannelConfig) -> Result<(), ConfigError> {
        self.channel(name)?.lock().apply_config(config)?;
        Ok(())
    }

    /// Current configuration of a channel.
    pub fn get_config(&self, name: &str) -> Option<ChannelConfig> {
        self.channels.get(name).map(|c| c.lock().config())
    }

    /// Compile and install a threshold, enabling alerting on success.
    pub fn set_threshold(&self, name: &str, text: &str) -> Result<(), ConfigError> {
        self.channel(name)?.lock().set_threshold(text)?;
        Ok(())
    }

    pub fn set_alerting_enabled(&self, name: &str, enabled: bool) -> Result<(), ConfigError> {
        self.channel(name)?.lock().set_alerting_enabled(enabled);
        Ok(())
    }

    pub fn debounce_state(&self, name: &str) -> Option<DebounceState> {
        self.channels.get(name).map(|c| c.lock().debounce_state())
    }

    /// Evaluate a decoded payload on every channel.
    ///
    /// Returns the alert edges produced, in channel name order.
    pub fn evaluate(&self, payload: &Reading) -> Vec<AlertEvent> {
        let mut events = Vec::new();
        for channel in self.channels.values() {
            if let Some(event) = channel.lock().evaluate(payload) {
                debug!("{}", event);
                events.push(event);
            }
        }
        events
    }
}
