//! On-disk configuration for the roverd daemon.
//!
//! One YAML file holds the whole control-session tuning. A missing file is
//! not an error: the daemon writes the defaults back so the operator has a
//! file to edit on first run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use openrover_runtime::SessionConfig;

/// Root of the `roverd.yaml` schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoverConfig {
    /// Control session tuning handed to the runtime at spawn.
    #[serde(default)]
    pub session: SessionConfig,
}

impl RoverConfig {
    /// Load the configuration from `path`, writing defaults there first when
    /// the file does not exist yet.
    pub async fn load_or_init(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            let config: Self = serde_yaml::from_str(&content)
                .with_context(|| format!("failed to parse config file {}", path.display()))?;
            debug!(path = %path.display(), "loaded config");
            Ok(config)
        } else {
            let config = Self::default();
            config.save(path).await?;
            info!(path = %path.display(), "created default config");
            Ok(config)
        }
    }

    /// Write the configuration to `path`, creating parent directories.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create config directory {}", parent.display())
            })?;
        }
        let content = self.to_yaml()?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("failed to write config file {}", path.display()))?;
        debug!(path = %path.display(), "saved config");
        Ok(())
    }

    /// Render the configuration as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("failed to serialize config")
    }

    /// Default location: `~/.config/openrover/roverd.yaml`.
    pub fn default_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("openrover")
            .join("roverd.yaml"))
    }
}
