//! Transport and device status notifications.

use std::fmt;

/// Connection status of the transport session, as reported to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransportStatus {
    /// A connect attempt is in flight.
    Connecting,
    /// Connected (initial connect succeeded).
    Connected,
    /// Connection was restored after an interruption.
    Reconnected,
    /// The connection was interrupted or torn down.
    Disconnected,
    /// The bounded reconnect attempt did not succeed in time.
    ReconnectFailed,
    /// Connected, but the topic subscription did not complete.
    SubscribeFailed,
}

impl TransportStatus {
    /// Returns a short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            TransportStatus::Connecting => "Connecting",
            TransportStatus::Connected => "Connected",
            TransportStatus::Reconnected => "Reconnected",
            TransportStatus::Disconnected => "Disconnected",
            TransportStatus::ReconnectFailed => "Reconnect Failed",
            TransportStatus::SubscribeFailed => "Subscribe Failed",
        }
    }

    /// True for statuses where the transport is usable.
    pub fn is_up(&self) -> bool {
        matches!(
            self,
            TransportStatus::Connected
                | TransportStatus::Reconnected
                | TransportStatus::SubscribeFailed
        )
    }
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transport: {}", self.label())
    }
}

/// Whether the remote device is actually producing data.
///
/// This is inferred from message arrival timing and is independent of
/// [`TransportStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceLiveness {
    /// No message seen yet and no timeout fired yet.
    #[default]
    Unknown,
    /// A message arrived within the liveness timeout.
    Online,
    /// No message arrived within the liveness timeout.
    Offline,
}

impl DeviceLiveness {
    /// Returns a short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            DeviceLiveness::Unknown => "Unknown",
            DeviceLiveness::Online => "Online",
            DeviceLiveness::Offline => "Offline",
        }
    }
}

impl fmt::Display for DeviceLiveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device: {}", self.label())
    }
}
