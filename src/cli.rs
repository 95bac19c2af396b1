// ABOUTME: Command-line flags and how they layer over the config file and environment

use crate::config::AppConfig;
use crate::launcher::LauncherState;
use crate::models::RuntimeKind;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Command-line flags. Each one overrides the config file and the environment.
#[derive(Debug, Parser)]
#[command(name = "quickcode", version, about = "Provision a remote coding session and attach to its shell")]
pub struct Cli {
    /// Config file (defaults to ~/.quickcode/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Provisioning service base URL
    #[arg(long)]
    pub service_url: Option<String>,

    /// Terminal WebSocket endpoint
    #[arg(long)]
    pub terminal_url: Option<String>,

    /// Session identifier to prefill instead of a random slug
    #[arg(long)]
    pub identifier: Option<String>,

    /// Runtime to prefill: nodeJs or python
    #[arg(long)]
    pub runtime: Option<RuntimeKind>,
}

impl Cli {
    /// File, then process environment, then flags
    pub fn load_config(&self) -> Result<AppConfig> {
        self.load_config_with(|key| std::env::var(key).ok())
    }

    /// Same as [`Cli::load_config`] with an injected environment lookup
    pub fn load_config_with<F>(&self, lookup: F) -> Result<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = AppConfig::load_layered(self.config.as_deref(), lookup)?;
        Ok(config.with_overrides(self.service_url.as_deref(), self.terminal_url.as_deref()))
    }

    /// Launcher form with any prefilled flags applied
    pub fn launcher_state(&self) -> LauncherState {
        let mut launcher = LauncherState::new();
        if let Some(identifier) = &self.identifier {
            launcher.identifier = identifier.clone();
        }
        if let Some(runtime) = self.runtime {
            launcher.runtime = runtime;
        }
        launcher
    }
}
