//! TOML Configuration File Support
//!
//! Centralized configuration loading, with a TOML file at
//! `~/.config/uistream/config.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables (`UISTREAM_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [transport]
//! endpoint = "http://localhost:3000/api/generate"
//! connect_timeout_ms = 5000
//! request_timeout_ms = 0
//!
//! [session]
//! event_buffer = 256
//! max_prompt_chars = 2000
//!
//! [playback]
//! char_interval_ms = 40
//! typing_pause_ms = 600
//! stage_interval_ms = 700
//! completion_pause_ms = 500
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::playback::PlaybackTiming;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Transport section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportToml {
    /// Generator endpoint URL
    pub endpoint: Option<String>,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,

    /// Overall request timeout in milliseconds (0 = no timeout)
    pub request_timeout_ms: Option<u64>,
}

/// Session section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionToml {
    /// Observer channel capacity
    pub event_buffer: Option<usize>,

    /// Maximum prompt length in characters
    pub max_prompt_chars: Option<usize>,
}

/// Playback section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackToml {
    /// Delay between typed prompt characters
    pub char_interval_ms: Option<u64>,

    /// Pause between the typed prompt and the first stage
    pub typing_pause_ms: Option<u64>,

    /// Delay between stages
    pub stage_interval_ms: Option<u64>,

    /// Pause after the last stage
    pub completion_pause_ms: Option<u64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiStreamToml {
    /// Transport configuration section
    pub transport: TransportToml,

    /// Session configuration section
    pub session: SessionToml,

    /// Playback configuration section
    pub playback: PlaybackToml,
}

// =============================================================================
// Resolved Settings
// =============================================================================

/// Settings for the HTTP patch source
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportSettings {
    /// Generator endpoint URL
    pub endpoint: String,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Overall request timeout in milliseconds (0 = no timeout)
    pub request_timeout_ms: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/api/generate".to_string(),
            connect_timeout_ms: 5000,
            request_timeout_ms: 0,
        }
    }
}

/// Settings for the session controller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    /// Observer channel capacity
    pub event_buffer: usize,
    /// Maximum prompt length in characters, enforced by callers
    pub max_prompt_chars: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            event_buffer: 256,
            max_prompt_chars: 2000,
        }
    }
}

/// Centralized configuration
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct UiStreamConfig {
    /// Transport settings
    pub transport: TransportSettings,

    /// Session settings
    pub session: SessionSettings,

    /// Playback timing
    pub playback: PlaybackTiming,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for UiStreamConfig {
    fn default() -> Self {
        Self {
            transport: TransportSettings::default(),
            session: SessionSettings::default(),
            playback: PlaybackTiming::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl UiStreamConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check values that would break the runtime
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.endpoint.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "transport.endpoint must not be empty".to_string(),
            ));
        }
        if self.session.event_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "session.event_buffer must be at least 1".to_string(),
            ));
        }
        if self.session.max_prompt_chars == 0 {
            return Err(ConfigError::ValidationError(
                "session.max_prompt_chars must be at least 1".to_string(),
            ));
        }
        if self.playback.stage_interval.is_zero() || self.playback.char_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "playback intervals must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/uistream/config.toml` or
/// `~/.config/uistream/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("uistream").join("config.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the merged configuration is invalid. A missing config file is not an
/// error (defaults are used).
pub fn load_config() -> Result<UiStreamConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<UiStreamConfig, ConfigError> {
    load_config_with_env(path, |name| std::env::var(name).ok())
}

fn load_config_with_env(
    path: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<UiStreamConfig, ConfigError> {
    let mut config = UiStreamConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: UiStreamToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);
    config.validate()?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut UiStreamConfig, toml: &UiStreamToml) {
    if let Some(ref endpoint) = toml.transport.endpoint {
        config.transport.endpoint.clone_from(endpoint);
    }
    if let Some(timeout) = toml.transport.connect_timeout_ms {
        config.transport.connect_timeout_ms = timeout;
    }
    if let Some(timeout) = toml.transport.request_timeout_ms {
        config.transport.request_timeout_ms = timeout;
    }

    if let Some(buffer) = toml.session.event_buffer {
        config.session.event_buffer = buffer;
    }
    if let Some(max) = toml.session.max_prompt_chars {
        config.session.max_prompt_chars = max;
    }

    if let Some(ms) = toml.playback.char_interval_ms {
        config.playback.char_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.playback.typing_pause_ms {
        config.playback.typing_pause = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.playback.stage_interval_ms {
        config.playback.stage_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.playback.completion_pause_ms {
        config.playback.completion_pause = Duration::from_millis(ms);
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut UiStreamConfig, env: impl Fn(&str) -> Option<String>) {
    let parse_u64 = |name: &str| env(name).and_then(|v| v.trim().parse::<u64>().ok());

    if let Some(endpoint) = env("UISTREAM_ENDPOINT") {
        config.transport.endpoint = endpoint;
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = parse_u64("UISTREAM_CONNECT_TIMEOUT_MS") {
        config.transport.connect_timeout_ms = ms;
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = parse_u64("UISTREAM_REQUEST_TIMEOUT_MS") {
        config.transport.request_timeout_ms = ms;
        config.source = ConfigSource::Env;
    }
    if let Some(buffer) = env("UISTREAM_EVENT_BUFFER").and_then(|v| v.trim().parse().ok()) {
        config.session.event_buffer = buffer;
        config.source = ConfigSource::Env;
    }
    if let Some(max) = env("UISTREAM_MAX_PROMPT_CHARS").and_then(|v| v.trim().parse().ok()) {
        config.session.max_prompt_chars = max;
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = parse_u64("UISTREAM_CHAR_INTERVAL_MS") {
        config.playback.char_interval = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = parse_u64("UISTREAM_TYPING_PAUSE_MS") {
        config.playback.typing_pause = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = parse_u64("UISTREAM_STAGE_INTERVAL_MS") {
        config.playback.stage_interval = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = parse_u64("UISTREAM_COMPLETION_PAUSE_MS") {
        config.playback.completion_pause = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Endpoint override
    pub endpoint: Option<String>,

    /// Stage interval override (milliseconds)
    pub stage_interval_ms: Option<u64>,

    /// Character interval override (milliseconds)
    pub char_interval_ms: Option<u64>,
}

impl ConfigOverrides {
    /// Create empty overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set endpoint override
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Set stage interval override
    #[must_use]
    pub fn with_stage_interval_ms(mut self, ms: u64) -> Self {
        self.stage_interval_ms = Some(ms);
        self
    }

    /// Set character interval override
    #[must_use]
    pub fn with_char_interval_ms(mut self, ms: u64) -> Self {
        self.char_interval_ms = Some(ms);
        self
    }

    /// Apply overrides to a loaded configuration
    pub fn apply(&self, config: &mut UiStreamConfig) {
        if let Some(ref endpoint) = self.endpoint {
            config.transport.endpoint.clone_from(endpoint);
            config.source = ConfigSource::Cli;
        }
        if let Some(ms) = self.stage_interval_ms {
            config.playback.stage_interval = Duration::from_millis(ms);
            config.source = ConfigSource::Cli;
        }
        if let Some(ms) = self.char_interval_ms {
            config.playback.char_interval = Duration::from_millis(ms);
            config.source = ConfigSource::Cli;
        }
    }
}
