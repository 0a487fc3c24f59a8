//! Settings for the `sensorwatch` binary.
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML file, then `SENSORWATCH_*` environment variables (`__` separates
//! nested keys, e.g. `SENSORWATCH_TRANSPORT__URL`), then command line
//! overrides.
//!
//! ```toml
//! [transport]
//! url = "nats://broker:4222"
//! topic = "sensors.data"
//!
//! [[channels]]
//! name = "Light"
//! variables = ["L"]
//! threshold = "L < 50"
//! enabled = true
//! fields = [{ variable = "L", source = "light" }]
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use sensorwatch_types::{ChannelConfig, FieldBinding};
use serde::{Deserialize, Serialize};

use crate::alert::{AlertEngine, Channel};
use crate::error::ConfigError;
use crate::session::{SessionConfig, DEFAULT_CONTROL_TOPIC};

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    pub url: String,
    pub topic: String,
    pub control_topic: String,
    pub client_id: Option<String>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            topic: "sensors/data".to_string(),
            control_topic: DEFAULT_CONTROL_TOPIC.to_string(),
            client_id: None,
        }
    }
}

/// Maps a payload field onto a channel variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub variable: String,
    pub source: String,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl FieldSpec {
    pub fn new(variable: &str, source: &str) -> Self {
        Self {
            variable: variable.to_string(),
            source: source.to_string(),
            scale: 1.0,
            offset: 0.0,
        }
    }

    pub fn binding(&self) -> FieldBinding {
        FieldBinding::new(self.source.as_str())
            .scale(self.scale)
            .offset(self.offset)
    }
}

/// One channel: its whitelist, bindings and stored threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub name: String,
    pub variables: Vec<String>,
    #[serde(default)]
    pub threshold: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl ChannelSpec {
    pub fn config(&self) -> ChannelConfig {
        ChannelConfig::new(self.threshold.as_str(), self.enabled)
    }

    /// Build the channel and apply the stored threshold.
    ///
    /// The channel is returned even if the threshold does not compile.
    pub fn build(&self) -> (Channel, Result<(), ConfigError>) {
        let mut channel = self
            .fields
            .iter()
            .fold(Channel::new(self.name.as_str(), &self.variables), |c, f| {
                c.with_field(f.variable.as_str(), f.binding())
            });
        let result = channel.apply_config(&self.config()).map_err(Into::into);
        (channel, result)
    }
}

/// The three channels of the reference sensor board.
pub fn default_channels() -> Vec<ChannelSpec> {
    let mut temperature = FieldSpec::new("T", "temperature");
    temperature.offset = -10.0;
    let mut humidity = FieldSpec::new("H", "humidity");
    humidity.scale = 100.0;

    vec![
        ChannelSpec {
            name: "Gyroscope".to_string(),
            variables: vec!["X".into(), "Y".into(), "Z".into()],
            threshold: String::new(),
            enabled: false,
            fields: vec![
                FieldSpec::new("X", "gyro_x"),
                FieldSpec::new("Y", "gyro_y"),
                FieldSpec::new("Z", "gyro_z"),
            ],
        },
        ChannelSpec {
            name: "Temperature & Humidity".to_string(),
            variables: vec!["T".into(), "H".into()],
            threshold: String::new(),
            enabled: false,
            fields: vec![temperature, humidity],
        },
        ChannelSpec {
            name: "Light".to_string(),
            variables: vec!["L".into()],
            threshold: String::new(),
            enabled: false,
            fields: vec![FieldSpec::new("L", "light")],
        },
    ]
}

/// Command line values that override every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub topic: Option<String>,
}

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub transport: TransportSettings,
    pub channels: Vec<ChannelSpec>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            transport: TransportSettings::default(),
            channels: default_channels(),
        }
    }
}

impl Settings {
    /// Load settings from all sources.
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(
                Environment::with_prefix("SENSORWATCH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("transport.url", overrides.url)?
            .set_override_option("transport.topic", overrides.topic)?
            .build()
            .context("Failed to read settings")?;

        config
            .try_deserialize()
            .context("Invalid settings")
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.transport.topic.as_str())
            .control_topic(self.transport.control_topic.as_str())
    }

    /// Build the alert engine.
    ///
    /// Channels whose stored threshold does not compile are still created,
    /// without a predicate; the errors are returned by channel name.
    pub fn build_engine(&self) -> (AlertEngine, Vec<(String, ConfigError)>) {
        let mut channels = Vec::with_capacity(self.channels.len());
        let mut errors = Vec::new();
        for spec in &self.channels {
            let (channel, result) = spec.build();
            if let Err(e) = result {
                errors.push((spec.name.clone(), e));
            }
            channels.push(channel);
        }
        (AlertEngine::new(channels), errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_toml(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::load(None, Overrides::default()).unwrap();
        assert_eq!(settings.transport.control_topic, "device/control");
        let names: Vec<_> = settings.channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Gyroscope", "Temperature & Humidity", "Light"]);
    }

    #[test]
    fn test_file_overrides_transport() {
        let file = write_toml(
            r#"
            [transport]
            url = "nats://broker:4222"
            topic = "lab.sensors"
            "#,
        );
        let settings = Settings::load(Some(file.path()), Overrides::default()).unwrap();
        assert_eq!(settings.transport.url, "nats://broker:4222");
        assert_eq!(settings.transport.topic, "lab.sensors");
        assert_eq!(settings.transport.control_topic, "device/control");
        assert_eq!(settings.channels.len(), 3);
    }

    #[test]
    fn test_cli_overrides_win() {
        let file = write_toml("[transport]\nurl = \"nats://file:4222\"\n");
        let overrides = Overrides {
            url: Some("nats://cli:4222".to_string()),
            topic: None,
        };
        let settings = Settings::load(Some(file.path()), overrides).unwrap();
        assert_eq!(settings.transport.url, "nats://cli:4222");
        assert_eq!(settings.transport.topic, "sensors/data");
    }

    #[test]
    fn test_file_channels_replace_defaults() {
        let file = write_toml(
            r#"
            [[channels]]
            name = "Light"
            variables = ["L"]
            threshold = "L < 50"
            enabled = true
            fields = [{ variable = "L", source = "lux", scale = 2 }]
            "#,
        );
        let settings = Settings::load(Some(file.path()), Overrides::default()).unwrap();
        assert_eq!(settings.channels.len(), 1);
        let light = &settings.channels[0];
        assert_eq!(light.fields[0].source, "lux");
        assert_eq!(light.fields[0].scale, 2.0);

        let (engine, errors) = settings.build_engine();
        assert!(errors.is_empty());
        assert_eq!(
            engine.get_config("Light"),
            Some(ChannelConfig::new("L < 50", true))
        );
    }

    #[test]
    fn test_bad_threshold_still_builds_channel() {
        let mut settings = Settings::default();
        settings.channels[2].threshold = "Q < 50".to_string();
        settings.channels[2].enabled = true;

        let (engine, errors) = settings.build_engine();
        assert_eq!(engine.len(), 3);
        assert_eq!(
            errors,
            vec![(
                "Light".to_string(),
                ConfigError::Compile(CompileError::UnknownVariable("Q".to_string()))
            )]
        );
        assert_eq!(engine.get_config("Light"), Some(ChannelConfig::new("", true)));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = Settings::load(
            Some(Path::new("/nonexistent/sensorwatch.toml")),
            Overrides::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_default_bindings() {
        let (engine, _) = Settings::default().build_engine();
        engine
            .set_threshold("Temperature & Humidity", "T > 20 and H > 40")
            .unwrap();
        let payload = sensorwatch_types::Reading::new()
            .with("temperature", 35.0)
            .with("humidity", 0.5);
        for _ in 0..2 {
            assert!(engine.evaluate(&payload).is_empty());
        }
        assert_eq!(engine.evaluate(&payload).len(), 1);
    }
}
