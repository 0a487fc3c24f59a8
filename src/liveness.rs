//! Device liveness watchdog.
//!
//! Infers whether the remote device is producing data from message arrival
//! times alone. A transport can be connected while the device is silent;
//! this monitor reports the device side of that picture.
//!
//! ```text
//!             message                    > 5s without a message
//!  Unknown ───────────► Online ◄──────────────────────────────► Offline
//!     │                              message                       ▲
//!     └────────────────────────────────────────────────────────────┘
//!                        > 5s without a message
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sensorwatch_types::DeviceLiveness;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::events::{emit, EventSender};

/// Silence longer than this marks the device offline.
pub const LIVENESS_TIMEOUT: Duration = Duration::from_secs(5);

/// How often the watchdog checks for silence.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Snapshot of the watchdog state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessState {
    pub last_message_at: Instant,
    pub status: DeviceLiveness,
}

/// Tracks the last message time and derives [`DeviceLiveness`].
///
/// Status changes are pushed to the event channel; repeated ticks with the
/// same outcome emit nothing.
#[derive(Debug)]
pub struct LivenessMonitor {
    state: Mutex<LivenessState>,
    timeout: Duration,
    events: EventSender,
}

impl LivenessMonitor {
    /// Create a new monitor. The silence clock starts now.
    pub fn new(events: EventSender) -> Self {
        Self {
            state: Mutex::new(LivenessState {
                last_message_at: Instant::now(),
                status: DeviceLiveness::Unknown,
            }),
            timeout: LIVENESS_TIMEOUT,
            events,
        }
    }

    pub fn status(&self) -> DeviceLiveness {
        self.state.lock().status
    }

    pub fn snapshot(&self) -> LivenessState {
        *self.state.lock()
    }

    /// Time since the last message, or since the clock was last reset.
    pub fn elapsed(&self) -> Duration {
        self.state.lock().last_message_at.elapsed()
    }

    /// Note a message arrival. The device is online immediately.
    pub fn record_message(&self) {
        let mut state = self.state.lock();
        state.last_message_at = Instant::now();
        self.transition(&mut state, DeviceLiveness::Online);
    }

    /// Check for silence. Only ever moves the status to offline; coming
    /// back online takes a message.
    pub fn tick(&self) {
        let mut state = self.state.lock();
        if state.last_message_at.elapsed() > self.timeout {
            self.transition(&mut state, DeviceLiveness::Offline);
        }
    }

    /// Restart the silence clock and forget the current status.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.last_message_at = Instant::now();
        self.transition(&mut state, DeviceLiveness::Unknown);
    }

    /// The device state can no longer be observed.
    pub fn mark_unknown(&self) {
        let mut state = self.state.lock();
        self.transition(&mut state, DeviceLiveness::Unknown);
    }

    /// The device is known to be unreachable.
    pub fn mark_offline(&self) {
        let mut state = self.state.lock();
        self.transition(&mut state, DeviceLiveness::Offline);
    }

    // Emits while holding the lock so events leave in transition order.
    fn transition(&self, state: &mut LivenessState, next: DeviceLiveness) {
        if state.status == next {
            return;
        }
        state.status = next;
        debug!("{}", next);
        emit(&self.events, next);
    }

    /// Spawn the periodic watchdog task.
    pub fn start(self: &Arc<Self>) -> TickerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let monitor = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = interval.tick() => monitor.tick(),
                }
            }
            debug!("Liveness ticker stopped");
        });

        TickerHandle { stop_tx, task }
    }
}

/// Handle to a running watchdog task.
///
/// Dropping the handle also stops the task, without waiting for it.
#[derive(Debug)]
pub struct TickerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TickerHandle {
    /// Stop the watchdog and wait for the task to exit.
    ///
    /// No tick fires after this returns.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
