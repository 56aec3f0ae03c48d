//! `.env` files.

use std::path::Path;

use crate::deploy::EnvVars;
use crate::error::{StratusError, StratusResult};

pub const ENV_FILE_NAME: &str = ".env";

/// Keys that hold credentials and are never pushed to the platform.
pub const CREDENTIAL_KEYS: [&str; 2] = ["ACCOUNT_SID", "AUTH_TOKEN"];

/// Read a `.env` file. A missing file reads as empty.
pub fn read_env_file(path: &Path) -> StratusResult<EnvVars> {
    if !path.exists() {
        return Ok(EnvVars::new());
    }

    let iter = dotenv::from_path_iter(path).map_err(|e| {
        StratusError::configuration(format!("Failed to read {}: {}", path.display(), e))
    })?;

    iter.map(|item| {
        item.map_err(|e| {
            StratusError::configuration(format!("Failed to parse {}: {}", path.display(), e))
        })
    })
    .collect()
}

/// Variables to set on the environment: empty values and credentials removed.
pub fn deploy_variables(local: &EnvVars) -> EnvVars {
    local
        .iter()
        .filter(|(key, value)| !value.is_empty() && !CREDENTIAL_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(read_env_file(&tmp.path().join(".env")).unwrap().is_empty());
    }

    #[test]
    fn credentials_and_blank_values_are_not_deployed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".env");
        std::fs::write(
            &path,
            "ACCOUNT_SID=AC123\nAUTH_TOKEN=secret\nGREETING=hello\nEMPTY=\n# comment\n",
        )
        .unwrap();

        let local = read_env_file(&path).unwrap();
        assert_eq!(local.get("AUTH_TOKEN").map(String::as_str), Some("secret"));

        let vars = deploy_variables(&local);
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("GREETING").map(String::as_str), Some("hello"));
    }
}
