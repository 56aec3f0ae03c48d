//! The parts of `package.json` a deployment uses.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{StratusError, StratusResult};
use crate::types::Dependency;

pub const PACKAGE_FILE_NAME: &str = "package.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PackageJson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl PackageJson {
    /// Read `package.json` from a project directory. A missing file reads as empty.
    pub fn read(dir: &Path) -> StratusResult<Self> {
        let path = dir.join(PACKAGE_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| StratusError::io(&path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            StratusError::configuration(format!("Invalid {}: {}", path.display(), e))
        })
    }

    /// Build dependencies, sorted by name.
    pub fn dependencies(&self) -> Vec<Dependency> {
        self.dependencies
            .iter()
            .map(|(name, version)| Dependency::new(name, version))
            .collect()
    }
}
