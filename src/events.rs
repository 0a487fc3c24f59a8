//! Outbound notification channel.
//!
//! Sessions push [`MonitorEvent`]s into an unbounded channel; the
//! presentation layer drains the receiver at its own pace.

use sensorwatch_types::MonitorEvent;
use tokio::sync::mpsc;
use tracing::trace;

pub type EventSender = mpsc::UnboundedSender<MonitorEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<MonitorEvent>;

/// Create a new event channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Send an event, ignoring a closed receiver.
pub(crate) fn emit(sender: &EventSender, event: impl Into<MonitorEvent>) {
    let event = event.into();
    trace!("Emitting {}", event);
    if sender.send(event).is_err() {
        trace!("Event receiver dropped");
    }
}
