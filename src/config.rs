use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the persisted access store
const STORE_FILE: &str = "user_access.json";

fn default_reset_hour() -> u32 {
    6
}

fn default_catalog_days() -> u32 {
    28
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GateConfig {
    /// Hour of day (0-23) at which a new access window opens
    #[serde(default = "default_reset_hour")]
    pub reset_hour: u32,

    /// Directory holding the access store; platform default if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Length of the content sequence in days
    #[serde(default = "default_catalog_days")]
    pub catalog_days: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            reset_hour: default_reset_hour(),
            data_dir: None,
            catalog_days: default_catalog_days(),
        }
    }
}

impl GateConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.reset_hour > 23 {
            anyhow::bail!("reset_hour must be in 0..=23, got {}", self.reset_hour);
        }

        if self.catalog_days == 0 {
            anyhow::bail!("catalog_days must be at least 1");
        }

        Ok(())
    }

    /// Path of the access store file
    pub fn store_path(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.join(STORE_FILE));
        }

        let dirs = directories::ProjectDirs::from("", "", "daygate")
            .context("Could not determine a data directory for this platform")?;
        Ok(dirs.data_local_dir().join(STORE_FILE))
    }
}

/// Load configuration from a YAML file
///
/// A missing file is not an error: all options have defaults.
pub fn load_config(path: &Path) -> Result<GateConfig> {
    if !path.exists() {
        debug!("No config file at {}, using defaults", path.display());
        return Ok(GateConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: GateConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse YAML config file: {}", path.display()))?;

    config.validate()?;

    Ok(config)
}
