//! Configuration loading for the dashboard shell.
//! Reads dacdash.toml from the current directory or the path in DACDASH_CONFIG.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Fragment the address bar starts with, e.g. `#company?org=climeworks`.
    #[serde(default)]
    pub initial_fragment: String,
    /// Page URL that shareable links are built on.
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_true")]
    pub print_state: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            initial_fragment: String::new(),
            base_url:         String::new(),
            print_state:      default_true(),
        }
    }
}

fn default_true() -> bool { true }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Start with the demo organisations instead of an empty store.
    #[serde(default = "default_true")]
    pub seed: bool,
    /// Artificial delay on every port call, in milliseconds.
    #[serde(default)]
    pub latency_ms: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { seed: default_true(), latency_ms: 0 }
    }
}


impl Config {
    /// Load configuration from dacdash.toml.
    /// Checks DACDASH_CONFIG env var first, then current directory.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("DACDASH_CONFIG")
            .unwrap_or_else(|_| "dacdash.toml".to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!(
                "Config file not found: {}\n\
                 Copy dacdash.example.toml to dacdash.toml and edit it.",
                path.display()
            );
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
