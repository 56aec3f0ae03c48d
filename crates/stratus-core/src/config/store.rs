//! Load and save `stratus.toml`.

use std::path::{Path, PathBuf};

use super::{StratusConfig, parser};
use crate::error::{StratusError, StratusResult};

pub const CONFIG_FILE_NAME: &str = "stratus.toml";

#[derive(Debug, Clone)]
pub struct ProjectStore {
    config_path: PathBuf,
}

impl ProjectStore {
    /// Store for the `stratus.toml` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::from_path(dir.join(CONFIG_FILE_NAME))
    }

    pub fn from_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// A missing file loads as an empty configuration.
    pub fn load(&self) -> StratusResult<StratusConfig> {
        if !self.config_path.exists() {
            return Ok(StratusConfig::new());
        }
        parser::parse_stratus_toml(&self.config_path)
    }

    pub fn save(&self, config: &StratusConfig) -> StratusResult<()> {
        let content = parser::to_toml(config)?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StratusError::io(parent, e))?;
        }
        std::fs::write(&self.config_path, content)
            .map_err(|e| StratusError::io(&self.config_path, e))?;
        Ok(())
    }

    /// Record the service sid deployed for an account, keeping everything else.
    pub fn remember_service(&self, account_sid: &str, service_sid: &str) -> StratusResult<()> {
        let mut config = self.load()?;
        if config.service_sid(account_sid) == Some(service_sid) {
            return Ok(());
        }
        config.set_service_sid(account_sid, service_sid);
        self.save(&config)
    }
}
