//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use neuroglove_core::{ApiConfig, ClientConfig, SessionConfig, SimulationMode};
use neuroglove_types::ReadingKind;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cli::OutputFormat;

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Backend session credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,

    /// Default glove address or name fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    /// Default sensor stream ("battery" or "flex-multi")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Simulation policy ("auto", "always" or "never")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation: Option<String>,

    /// Interval between synthetic readings in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation_interval_ms: Option<u64>,

    /// Discovery scan window in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_timeout: Option<u64>,

    /// Connection timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u64>,

    /// Default output format ("text" or "json")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("neuroglove")
            .join("config.toml")
    }

    /// Load config from a file, or return default if not found.
    ///
    /// An unreadable or malformed file is reported and ignored.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Failed to parse config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save config to a file, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// A config with every setting spelled out at its default value.
    pub fn with_defaults() -> Self {
        let client = ClientConfig::default();
        Self {
            url: Some(client.api.base_url),
            token: None,
            request_timeout: Some(client.api.request_timeout.as_secs()),
            device: None,
            mode: Some(client.session.mode.to_string()),
            simulation: Some(client.session.simulation.to_string()),
            simulation_interval_ms: Some(client.session.simulation_interval.as_millis() as u64),
            scan_timeout: Some(client.session.scan_timeout.as_secs()),
            connect_timeout: Some(client.session.connect_timeout.as_secs()),
            format: Some("text".to_string()),
            no_color: false,
        }
    }

    /// Resolve the output format: explicit flag, then config, then text.
    pub fn resolve_format(&self, flag: Option<OutputFormat>) -> Result<OutputFormat> {
        match (flag, &self.format) {
            (Some(format), _) => Ok(format),
            (None, Some(format)) => format
                .parse()
                .map_err(|e: String| anyhow::anyhow!("Invalid format in config: {e}")),
            (None, None) => Ok(OutputFormat::default()),
        }
    }

    /// Build the library configuration.
    ///
    /// Command-line flags (and their environment variables) override the
    /// file; anything unset falls back to library defaults.
    pub fn to_client_config(&self, overrides: &Overrides) -> Result<ClientConfig> {
        let mut api = ApiConfig::default();
        if let Some(url) = overrides.url.as_ref().or(self.url.as_ref()) {
            api.base_url = url.clone();
        }
        api.credential = overrides.token.clone().or_else(|| self.token.clone());
        if let Some(secs) = self.request_timeout {
            api.request_timeout = Duration::from_secs(secs);
        }

        let mut session = SessionConfig::default();
        let mode = overrides.mode.map(Ok).or_else(|| {
            self.mode
                .as_deref()
                .map(|m| m.parse::<ReadingKind>().context("Invalid mode in config"))
        });
        if let Some(mode) = mode {
            session.mode = mode?;
        }
        let simulation = overrides.simulation.map(Ok).or_else(|| {
            self.simulation
                .as_deref()
                .map(|s| s.parse::<SimulationMode>().context("Invalid simulation in config"))
        });
        if let Some(simulation) = simulation {
            session.simulation = simulation?;
        }
        if let Some(ms) = self.simulation_interval_ms {
            session.simulation_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = self.scan_timeout {
            session.scan_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.connect_timeout {
            session.connect_timeout = Duration::from_secs(secs);
        }
        session.device_filter = overrides.device.clone().or_else(|| self.device.clone());

        let config = ClientConfig { api, session };
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

/// Settings given on the command line, taking precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub token: Option<String>,
    pub device: Option<String>,
    pub mode: Option<ReadingKind>,
    pub simulation: Option<SimulationMode>,
}
