//! Configuration loading and typed config structures for turboevents.
//!
//! The configuration lives in `turboevents.yaml`. Every section and field has
//! a default, so an empty file (or no file at all) is a valid configuration
//! that prints to standard output.
//!
//! Environment variables override connection settings:
//! - `NATS_URL` overrides `nats.url`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::clock;
use crate::input::DEFAULT_COUNT_DOWN_INTERVAL_MS;
use crate::output::{OutputKind, PrintFormat};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but holds an unusable value.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `turboevents.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TurboConfig {
    /// Run settings (time shift, window).
    #[serde(default)]
    pub run: RunSettings,

    /// Output selection.
    #[serde(default)]
    pub output: OutputConfig,

    /// NATS connection and publishing settings.
    #[serde(default)]
    pub nats: NatsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Inputs registered at startup.
    #[serde(default)]
    pub inputs: InputsConfig,
}

impl TurboConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `NATS_URL` from the process environment overrides `nats.url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Self::parse_with_env(yaml, |key| std::env::var(key).ok())
    }

    /// Parse configuration from a YAML string, reading overrides through
    /// `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`TurboConfig::parse`].
    pub fn parse_with_env(
        yaml: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty map.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.nats.apply_env_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Check values that YAML typing cannot rule out.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.run.window()?;
        if self.nats.subject.trim().is_empty() {
            return Err(invalid("nats.subject must not be empty"));
        }
        if self.nats.tls_cert.is_some() != self.nats.tls_key.is_some() {
            return Err(invalid("nats.tls_cert and nats.tls_key must be set together"));
        }
        for file in &self.inputs.xml_files {
            if file.control.trim().is_empty() {
                return Err(invalid(&format!(
                    "inputs.xml_files: empty control string for {}",
                    file.path.display()
                )));
            }
        }
        if self
            .inputs
            .default_control
            .as_deref()
            .is_some_and(|control| control.trim().is_empty())
        {
            return Err(invalid("inputs.default_control must not be empty"));
        }
        if self.inputs.count_down.iter().any(|c| c.interval_ms == 0) {
            return Err(invalid("inputs.count_down: interval_ms must be positive"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

/// Run settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RunSettings {
    /// Move recorded timestamps so each input starts at the run start.
    #[serde(default)]
    pub time_shift: bool,

    /// Maximum run duration in seconds. Unset runs until the inputs drain.
    #[serde(default)]
    pub window_secs: Option<f64>,
}

impl RunSettings {
    /// The run window as a [`Duration`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `window_secs` is negative or not
    /// finite.
    pub fn window(&self) -> Result<Option<Duration>, ConfigError> {
        self.window_secs
            .map(clock::window_from_secs)
            .transpose()
            .map_err(|e| invalid(&format!("run.window_secs: {e}")))
    }
}

/// Output selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct OutputConfig {
    /// Which output receives events.
    #[serde(default)]
    pub kind: OutputKind,

    /// Line format of the print output.
    #[serde(default)]
    pub print_format: PrintFormat,
}

/// Body encoding of published messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageBody {
    /// The payload bytes.
    #[default]
    Raw,
    /// The whole event as JSON.
    Json,
}

/// NATS connection and publishing settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NatsConfig {
    /// Server URL.
    #[serde(default = "default_nats_url")]
    pub url: String,

    /// Subject every event is published on.
    #[serde(default = "default_subject")]
    pub subject: String,

    /// Message body encoding.
    #[serde(default)]
    pub body: MessageBody,

    /// PEM file with the root certificate used to verify the server.
    #[serde(default)]
    pub tls_ca: Option<PathBuf>,

    /// PEM file with the client certificate.
    #[serde(default)]
    pub tls_cert: Option<PathBuf>,

    /// PEM file with the client private key.
    #[serde(default)]
    pub tls_key: Option<PathBuf>,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: default_nats_url(),
            subject: default_subject(),
            body: MessageBody::default(),
            tls_ca: None,
            tls_cert: None,
            tls_key: None,
        }
    }
}

impl NatsConfig {
    /// Override connection settings from environment variables.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("NATS_URL") {
            self.url = val;
        }
    }

    /// Whether any TLS material is configured.
    pub const fn uses_tls(&self) -> bool {
        self.tls_ca.is_some() || self.tls_cert.is_some()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Line format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Inputs registered at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InputsConfig {
    /// XML files to replay.
    #[serde(default)]
    pub xml_files: Vec<XmlFileConfig>,

    /// Count-down inputs.
    #[serde(default)]
    pub count_down: Vec<CountDownConfig>,

    /// Control string for XML files given without one.
    #[serde(default)]
    pub default_control: Option<String>,
}

impl InputsConfig {
    /// Whether no input is configured.
    pub fn is_empty(&self) -> bool {
        self.xml_files.is_empty() && self.count_down.is_empty()
    }
}

/// One XML file input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct XmlFileConfig {
    /// Path of the XML document.
    pub path: PathBuf,

    /// Control string selecting the streams.
    pub control: String,
}

/// One count-down input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CountDownConfig {
    /// First value; the input counts down to 1.
    pub count: i64,

    /// Milliseconds between values.
    #[serde(default = "default_count_down_interval_ms")]
    pub interval_ms: u64,
}

impl CountDownConfig {
    /// A count-down from `count` at the default interval.
    pub const fn new(count: i64) -> Self {
        Self {
            count,
            interval_ms: DEFAULT_COUNT_DOWN_INTERVAL_MS,
        }
    }

    /// The interval as a [`Duration`].
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_owned()
}

fn default_subject() -> String {
    "turboevents.events".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_count_down_interval_ms() -> u64 {
    DEFAULT_COUNT_DOWN_INTERVAL_MS
}
