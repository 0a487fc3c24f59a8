//! A monitored sensor group with its own threshold and alert state.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use sensorwatch_types::{AlertEvent, ChannelConfig, FieldBinding, Reading};
use tracing::{debug, warn};

use super::debounce::{AlertDebouncer, DebounceState, Transition};
use crate::error::CompileError;
use crate::expr::{compile, Predicate};

/// One channel of the alert engine.
///
/// Holds the variable whitelist, the compiled predicate, the enable flag
/// and the hysteresis state. A channel is not shared by itself; the
/// [`AlertEngine`](super::AlertEngine) wraps each one in a mutex.
#[derive(Debug, Clone)]
pub struct Channel {
    name: String,
    allowed: BTreeSet<String>,
    fields: BTreeMap<String, FieldBinding>,
    predicate: Option<Arc<Predicate>>,
    enabled: bool,
    debounce: DebounceState,
    debouncer: AlertDebouncer,
}

impl Channel {
    /// Create a new channel with the given variable whitelist.
    ///
    /// Alerting starts disabled and no threshold is set.
    pub fn new<I, S>(name: impl Into<String>, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            allowed: variables.into_iter().map(Into::into).collect(),
            fields: BTreeMap::new(),
            predicate: None,
            enabled: false,
            debounce: DebounceState::default(),
            debouncer: AlertDebouncer::new(),
        }
    }

    /// Map a variable to a payload field.
    ///
    /// Variables without a binding are read from the payload field of the
    /// same name.
    pub fn with_field(mut self, variable: impl Into<String>, binding: FieldBinding) -> Self {
        self.fields.insert(variable.into(), binding);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn allowed_variables(&self) -> &BTreeSet<String> {
        &self.allowed
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_deref()
    }

    pub fn is_alerting_enabled(&self) -> bool {
        self.enabled
    }

    pub fn debounce_state(&self) -> DebounceState {
        self.debounce
    }

    /// Compile and install a new threshold, then enable alerting.
    ///
    /// On error the previous predicate and enable flag are left untouched.
    pub fn set_threshold(&mut self, text: &str) -> Result<(), CompileError> {
        let predicate = self.compile(text)?;
        debug!(channel = %self.name, "Threshold set to '{}'", predicate.source());
        self.predicate = Some(Arc::new(predicate));
        self.set_alerting_enabled(true);
        Ok(())
    }

    fn compile(&self, text: &str) -> Result<Predicate, CompileError> {
        compile(text, &self.allowed).map_err(|e| {
            warn!(channel = %self.name, "Threshold '{}' rejected: {}", text.trim(), e);
            e
        })
    }

    /// Toggle alerting.
    ///
    /// Disabling freezes the streaks. Turning alerting back on restarts
    /// both streaks from zero; the alert state is kept.
    pub fn set_alerting_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.debounce.reset_streaks();
        }
        self.enabled = enabled;
    }

    /// Apply a stored configuration.
    ///
    /// The enable flag always applies. A blank threshold removes the
    /// predicate; an invalid one keeps the previous predicate and returns
    /// the compile error.
    pub fn apply_config(&mut self, config: &ChannelConfig) -> Result<(), CompileError> {
        let result = if config.threshold.trim().is_empty() {
            self.predicate = None;
            Ok(())
        } else {
            self.compile(&config.threshold).map(|predicate| {
                self.predicate = Some(Arc::new(predicate));
            })
        };
        self.set_alerting_enabled(config.enabled);
        result
    }

    /// Current configuration, with the threshold of the active predicate.
    pub fn config(&self) -> ChannelConfig {
        ChannelConfig::new(
            self.predicate
                .as_ref()
                .map(|p| p.source().to_string())
                .unwrap_or_default(),
            self.enabled,
        )
    }

    /// Extract this channel's variables from a decoded payload.
    ///
    /// Variables whose source field is absent are left out, so evaluation
    /// reports them as missing. Absent fields are deliberately not read as 0:
    /// a device that stops sending a field must not look like a calm reading.
    pub fn project(&self, payload: &Reading) -> Reading {
        self.allowed
            .iter()
            .filter_map(|variable| match self.fields.get(variable) {
                Some(binding) => payload
                    .get(&binding.source)
                    .map(|raw| (variable.clone(), binding.apply(raw))),
                None => payload.get(variable).map(|value| (variable.clone(), value)),
            })
            .collect()
    }

    /// Evaluate a decoded payload and advance the debounce state.
    ///
    /// Skipped entirely when alerting is disabled or no threshold is set.
    /// Evaluation errors are logged and count as a non-breach.
    pub fn evaluate(&mut self, payload: &Reading) -> Option<AlertEvent> {
        if !self.enabled {
            return None;
        }
        let predicate = self.predicate.clone()?;

        let reading = self.project(payload);
        let breached = match predicate.evaluate(&reading) {
            Ok(breached) => breached,
            Err(e) => {
                warn!(channel = %self.name, "Evaluation of '{}' failed: {}", predicate.source(), e);
                false
            }
        };

        let (next, transition) = self.debouncer.update(self.debounce, breached);
        self.debounce = next;
        transition.map(|t| match t {
            Transition::Raised => AlertEvent::raised(self.name.as_str()),
            Transition::Cleared => AlertEvent::cleared(self.name.as_str()),
        })
    }
}
