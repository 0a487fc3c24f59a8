//! Per-channel configuration and device control commands.

use std::fmt;

/// The persisted per-channel settings.
///
/// An external config layer loads and saves these; the alerting core only
/// compiles the expression and applies the flag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ChannelConfig {
    /// Threshold expression, e.g. `"T > 50 and H > 80"`. Empty means unset.
    pub threshold: String,
    /// Whether alert evaluation runs for this channel.
    pub enabled: bool,
}

impl ChannelConfig {
    /// Create a config with the given expression and flag.
    pub fn new(threshold: impl Into<String>, enabled: bool) -> Self {
        Self {
            threshold: threshold.into(),
            enabled,
        }
    }
}

/// Maps a decoded payload field onto a channel variable.
///
/// The variable's value is `raw * scale + offset`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldBinding {
    /// Field name in the decoded payload.
    pub source: String,
    #[cfg_attr(feature = "serde", serde(default = "default_scale"))]
    pub scale: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub offset: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl FieldBinding {
    /// Bind a payload field without any calibration.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            scale: default_scale(),
            offset: 0.0,
        }
    }

    /// Set the multiplier applied to the raw value.
    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the constant added after scaling.
    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// Apply the calibration to a raw value.
    pub fn apply(&self, raw: f64) -> f64 {
        raw * self.scale + self.offset
    }
}

/// A start/stop request published to the device's control topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum ControlCommand {
    Start,
    Stop,
}

impl ControlCommand {
    /// The action string the device firmware expects.
    pub fn action(&self) -> &'static str {
        match self {
            ControlCommand::Start => "START",
            ControlCommand::Stop => "STOP",
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_binding_calibration() {
        let temperature = FieldBinding::new("temperature").offset(-10.0);
        assert_eq!(temperature.apply(35.0), 25.0);

        let humidity = FieldBinding::new("humidity").scale(100.0);
        assert_eq!(humidity.apply(0.5), 50.0);
    }

    #[test]
    fn test_control_display() {
        assert_eq!(ControlCommand::Start.to_string(), "START");
        assert_eq!(ControlCommand::Stop.to_string(), "STOP");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_control_serializes_as_firmware_action() {
        for command in [ControlCommand::Start, ControlCommand::Stop] {
            let json = serde_json::to_string(&command).unwrap();
            assert_eq!(json, format!("\"{}\"", command.action()));
            let back: ControlCommand = serde_json::from_str(&json).unwrap();
            assert_eq!(back, command);
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_field_binding_defaults_from_json() {
        let binding: FieldBinding = serde_json::from_str(r#"{"source":"light"}"#).unwrap();
        assert_eq!(binding, FieldBinding::new("light"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_channel_config_defaults_from_json() {
        let config: ChannelConfig = serde_json::from_str(r#"{"threshold":"L<50"}"#).unwrap();
        assert_eq!(config, ChannelConfig::new("L<50", false));
    }
}
