// ABOUTME: Application configuration loaded from ~/.quickcode/config.toml with environment overrides
// Holds the provisioning endpoint, the terminal socket endpoint and the byte decoding mode

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::terminal::ByteDecoding;

/// Provisioning service used when nothing else is configured
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:3001";
/// Terminal socket endpoint used when nothing else is configured
pub const DEFAULT_TERMINAL_URL: &str = "ws://localhost:3001/terminal";

const SERVICE_URL_ENV: &str = "QUICKCODE_SERVICE_URL";
const TERMINAL_URL_ENV: &str = "QUICKCODE_TERMINAL_URL";

/// Endpoints and terminal settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the provisioning service (`POST {service_url}/project`)
    pub service_url: String,
    /// WebSocket endpoint serving terminal sessions
    pub terminal_url: String,
    /// How raw byte frames from the shell are turned into text
    pub byte_decoding: ByteDecoding,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            terminal_url: DEFAULT_TERMINAL_URL.to_string(),
            byte_decoding: ByteDecoding::default(),
        }
    }
}

impl AppConfig {
    /// Layered load: file (explicit path or the default location), then
    /// environment lookups on top
    pub fn load_layered<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(lookup);
        Ok(config)
    }

    /// Load from an explicit file. A missing or blank file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// `~/.quickcode/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".quickcode").join("config.toml"))
    }

    /// Explicit values (command-line flags) win over everything loaded so far
    pub fn with_overrides(mut self, service_url: Option<&str>, terminal_url: Option<&str>) -> Self {
        if let Some(url) = service_url {
            self.service_url = url.to_string();
        }
        if let Some(url) = terminal_url {
            self.terminal_url = url.to_string();
        }
        self
    }

    /// Override URLs from environment-style lookups. Takes a lookup function so
    /// tests do not have to mutate the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(SERVICE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            debug!("Service URL overridden by {}", SERVICE_URL_ENV);
            self.service_url = url;
        }
        if let Some(url) = lookup(TERMINAL_URL_ENV).filter(|v| !v.trim().is_empty()) {
            debug!("Terminal URL overridden by {}", TERMINAL_URL_ENV);
            self.terminal_url = url;
        }
    }
}
