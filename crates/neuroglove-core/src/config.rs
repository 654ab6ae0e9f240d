//! Client configuration.
//!
//! A [`ClientConfig`] is constructed once and handed to each component when it
//! is built; nothing in this crate reads configuration from globals.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use neuroglove_types::ReadingKind;

use crate::error::{Error, Result};

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";

/// Top-level configuration for a NeuroGlove client.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Backend API settings.
    pub api: ApiConfig,
    /// Device session settings.
    pub session: SessionConfig,
}

impl ClientConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend API settings.
    #[must_use]
    pub fn api(mut self, api: ApiConfig) -> Self {
        self.api = api;
        self
    }

    /// Set the session settings.
    #[must_use]
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Validate both halves of the configuration.
    pub fn validate(&self) -> Result<()> {
        self.api.validate()?;
        self.session.validate()
    }
}

/// Backend REST API settings.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL of the backend, e.g. `http://localhost:8001`.
    pub base_url: String,
    /// Opaque session credential, sent as a bearer token when present.
    pub credential: Option<String>,
    /// Timeout for each HTTP request.
    pub request_timeout: Duration,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credential: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ApiConfig {
    /// Create API settings for a base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the session credential.
    #[must_use]
    pub fn credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Check that the base URL is an http(s) URL and the timeout is non-zero.
    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::invalid_config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::invalid_config("request_timeout must be > 0"));
        }
        Ok(())
    }
}

/// When the session substitutes synthetic readings for a live stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationMode {
    /// Simulate only when the peripheral lacks the sensor characteristic.
    #[default]
    Auto,
    /// Always simulate, even when a live characteristic exists.
    Always,
    /// Never simulate; a missing characteristic fails the connect.
    Never,
}

impl fmt::Display for SimulationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationMode::Auto => write!(f, "auto"),
            SimulationMode::Always => write!(f, "always"),
            SimulationMode::Never => write!(f, "never"),
        }
    }
}

impl FromStr for SimulationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(SimulationMode::Auto),
            "always" | "on" => Ok(SimulationMode::Always),
            "never" | "off" => Ok(SimulationMode::Never),
            other => Err(Error::invalid_config(format!(
                "unknown simulation mode '{other}' (expected auto, always or never)"
            ))),
        }
    }
}

/// Device session settings.
///
/// ```
/// use std::time::Duration;
/// use neuroglove_core::{SessionConfig, SimulationMode};
/// use neuroglove_types::ReadingKind;
///
/// let config = SessionConfig::default()
///     .mode(ReadingKind::Battery)
///     .simulation(SimulationMode::Never)
///     .connect_timeout(Duration::from_secs(20));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Which sensor stream to subscribe to.
    pub mode: ReadingKind,
    /// Simulation fallback policy.
    pub simulation: SimulationMode,
    /// Interval between synthetic readings.
    pub simulation_interval: Duration,
    /// How long discovery scans before reporting NotFound.
    pub scan_timeout: Duration,
    /// Upper bound on the transport connect.
    pub connect_timeout: Duration,
    /// Identifier or name fragment the discovered peripheral must match.
    pub device_filter: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: ReadingKind::FlexMulti,
            simulation: SimulationMode::Auto,
            simulation_interval: Duration::from_secs(1),
            scan_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(15),
            device_filter: None,
        }
    }
}

impl SessionConfig {
    /// Set the reading kind to stream.
    #[must_use]
    pub fn mode(mut self, mode: ReadingKind) -> Self {
        self.mode = mode;
        self
    }

    /// Set the simulation policy.
    #[must_use]
    pub fn simulation(mut self, simulation: SimulationMode) -> Self {
        self.simulation = simulation;
        self
    }

    /// Set the synthetic reading interval.
    #[must_use]
    pub fn simulation_interval(mut self, interval: Duration) -> Self {
        self.simulation_interval = interval;
        self
    }

    /// Set the discovery scan window.
    #[must_use]
    pub fn scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Restrict discovery to peripherals matching this identifier or name.
    #[must_use]
    pub fn device_filter(mut self, filter: impl Into<String>) -> Self {
        self.device_filter = Some(filter.into());
        self
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<()> {
        if self.simulation_interval.is_zero() {
            return Err(Error::invalid_config("simulation_interval must be > 0"));
        }
        if self.scan_timeout.is_zero() {
            return Err(Error::invalid_config("scan_timeout must be > 0"));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::invalid_config("connect_timeout must be > 0"));
        }
        Ok(())
    }
}
