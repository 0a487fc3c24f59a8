//! Alert and monitor events emitted to the presentation layer.

use std::fmt;

use crate::{DeviceLiveness, TransportStatus};

/// An edge-triggered alert notification for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlertEvent {
    /// The channel's threshold has been breached for long enough to alert.
    Raised { channel: String, message: String },
    /// The channel has recovered for long enough to clear the alert.
    Cleared { channel: String },
}

impl AlertEvent {
    /// Build a `Raised` event with the standard message.
    pub fn raised(channel: impl Into<String>) -> Self {
        let channel = channel.into();
        let message = format!("{} exceeds threshold!", channel);
        AlertEvent::Raised { channel, message }
    }

    /// Build a `Cleared` event.
    pub fn cleared(channel: impl Into<String>) -> Self {
        AlertEvent::Cleared {
            channel: channel.into(),
        }
    }

    /// Name of the channel this event belongs to.
    pub fn channel(&self) -> &str {
        match self {
            AlertEvent::Raised { channel, .. } => channel,
            AlertEvent::Cleared { channel } => channel,
        }
    }

    /// True for `Raised`.
    pub fn is_raised(&self) -> bool {
        matches!(self, AlertEvent::Raised { .. })
    }
}

impl fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertEvent::Raised { message, .. } => write!(f, "Alert raised: {}", message),
            AlertEvent::Cleared { channel } => write!(f, "Alert cleared: {}", channel),
        }
    }
}

/// Every notification a session can emit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MonitorEvent {
    Transport(TransportStatus),
    Device(DeviceLiveness),
    Alert(AlertEvent),
}

impl fmt::Display for MonitorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorEvent::Transport(status) => fmt::Display::fmt(status, f),
            MonitorEvent::Device(liveness) => fmt::Display::fmt(liveness, f),
            MonitorEvent::Alert(alert) => fmt::Display::fmt(alert, f),
        }
    }
}

impl From<TransportStatus> for MonitorEvent {
    fn from(status: TransportStatus) -> Self {
        MonitorEvent::Transport(status)
    }
}

impl From<DeviceLiveness> for MonitorEvent {
    fn from(liveness: DeviceLiveness) -> Self {
        MonitorEvent::Device(liveness)
    }
}

impl From<AlertEvent> for MonitorEvent {
    fn from(alert: AlertEvent) -> Self {
        MonitorEvent::Alert(alert)
    }
}
