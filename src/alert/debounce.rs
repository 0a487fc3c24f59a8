//! Breach/recovery hysteresis for one channel.
//!
//! # State Machine
//!
//! ```text
//!            3 consecutive breaches
//!  Normal ─────────────────────────► Alerting
//!    ▲                                  │
//!    └──────────────────────────────────┘
//!           3 consecutive recoveries
//! ```
//!
//! A single non-breach in `Normal` zeroes the breach streak. A single
//! breach in `Alerting` zeroes the recovery streak. The two streaks are
//! never both non-zero.

/// Consecutive breaches needed to raise an alert.
pub const BREACH_REQUIRED: u32 = 3;

/// Consecutive non-breaches needed to clear an alert.
pub const RECOVERY_REQUIRED: u32 = 3;

/// Alert state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertState {
    #[default]
    Normal,
    Alerting,
}

/// Hysteresis state owned by a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebounceState {
    pub state: AlertState,
    pub breach_streak: u32,
    pub recovery_streak: u32,
}

impl DebounceState {
    pub fn is_alerting(&self) -> bool {
        self.state == AlertState::Alerting
    }

    /// Zero both streaks, keeping the alert state.
    pub fn reset_streaks(&mut self) {
        self.breach_streak = 0;
        self.recovery_streak = 0;
    }
}

/// Edge produced by [`AlertDebouncer::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Raised,
    Cleared,
}

/// Pure state transition function for [`DebounceState`].
#[derive(Debug, Clone, Copy)]
pub struct AlertDebouncer {
    breach_required: u32,
    recovery_required: u32,
}

impl Default for AlertDebouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertDebouncer {
    /// Create a new debouncer with the fixed 3/3 limits.
    pub const fn new() -> Self {
        Self {
            breach_required: BREACH_REQUIRED,
            recovery_required: RECOVERY_REQUIRED,
        }
    }

    /// Apply one evaluation result.
    ///
    /// | state | breached | action |
    /// |---|---|---|
    /// | Normal | true | breach += 1, raise at the limit |
    /// | Normal | false | breach = 0 |
    /// | Alerting | true | breach += 1 (saturating), recovery = 0 |
    /// | Alerting | false | recovery += 1, clear at the limit |
    pub fn update(
        &self,
        current: DebounceState,
        breached: bool,
    ) -> (DebounceState, Option<Transition>) {
        let mut next = current;
        let transition = match (current.state, breached) {
            (AlertState::Normal, true) => {
                next.breach_streak = current.breach_streak.saturating_add(1);
                next.recovery_streak = 0;
                if next.breach_streak >= self.breach_required {
                    next.state = AlertState::Alerting;
                    Some(Transition::Raised)
                } else {
                    None
                }
            }

            (AlertState::Normal, false) => {
                next.reset_streaks();
                None
            }

            (AlertState::Alerting, true) => {
                next.breach_streak = current.breach_streak.saturating_add(1);
                next.recovery_streak = 0;
                None
            }

            (AlertState::Alerting, false) => {
                next.breach_streak = 0;
                next.recovery_streak = current.recovery_streak.saturating_add(1);
                if next.recovery_streak >= self.recovery_required {
                    next = DebounceState::default();
                    Some(Transition::Cleared)
                } else {
                    None
                }
            }
        };
        (next, transition)
    }
}
