use crate::output::OutputFormat;
use anyhow::{Context, Result};
use cleanupkit::WaitConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("awstbx"))
}

/// Get the default config file path
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Items requested per listing page
    pub page_size: usize,
    pub output: OutputFormat,
    pub waits: WaitSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: 50,
            output: OutputFormat::Table,
            waits: WaitSettings::default(),
        }
    }
}

/// Polling budgets for each asynchronous transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitSettings {
    /// Stack instance deletion operations
    pub stack_set_operation: WaitConfig,
    /// Apps and spaces of a user profile draining away
    pub user_profile_dependencies: WaitConfig,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            stack_set_operation: WaitConfig::new(Duration::from_secs(5), 360),
            user_profile_dependencies: WaitConfig::new(Duration::from_secs(5), 120),
        }
    }
}

impl Config {
    /// Load config from `path`, or from the default location.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = default_config_path()?;
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    log::debug!("no config at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config format in {}", path.display()))?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }
}
