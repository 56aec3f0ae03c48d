//! Application context shared by the frontends.

use std::path::{Path, PathBuf};

use crate::config::env::ENV_FILE_NAME;
use crate::config::{PackageJson, ProjectStore, StratusConfig, read_env_file};
use crate::deploy::EnvVars;
use crate::error::StratusResult;

/// Paths a command works with.
///
/// The CLI creates this once and derives stores and project files from it.
#[derive(Debug, Clone)]
pub struct AppContext {
    project_root: PathBuf,
    global_config_dir: PathBuf,
}

impl AppContext {
    pub fn new(project_root: PathBuf) -> Self {
        let global_config_dir = dirs::config_dir()
            .map(|p| p.join("stratus"))
            .or_else(|| dirs::home_dir().map(|h| h.join(".config").join("stratus")))
            .unwrap_or_else(|| project_root.join(".stratus"));

        Self {
            project_root,
            global_config_dir,
        }
    }

    /// Create context with custom global config directory (for testing).
    pub fn with_global_config_dir(project_root: PathBuf, global_config_dir: PathBuf) -> Self {
        Self {
            project_root,
            global_config_dir,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn global_config_dir(&self) -> &Path {
        &self.global_config_dir
    }

    pub fn project_store(&self) -> ProjectStore {
        ProjectStore::in_dir(&self.project_root)
    }

    pub fn global_store(&self) -> ProjectStore {
        ProjectStore::in_dir(&self.global_config_dir)
    }

    /// Project configuration with user-level defaults filled in.
    pub fn load_config(&self) -> StratusResult<StratusConfig> {
        let global = self.global_store().load()?;
        Ok(self.project_store().load()?.with_defaults(&global))
    }

    /// Path of the project's `.env`, or `override_path` resolved against the root.
    pub fn env_path(&self, override_path: Option<&Path>) -> PathBuf {
        match override_path {
            Some(path) => self.project_root.join(path),
            None => self.project_root.join(ENV_FILE_NAME),
        }
    }

    pub fn read_env(&self, override_path: Option<&Path>) -> StratusResult<EnvVars> {
        read_env_file(&self.env_path(override_path))
    }

    pub fn package_json(&self) -> StratusResult<PackageJson> {
        PackageJson::read(&self.project_root)
    }
}
