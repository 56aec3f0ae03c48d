//! Schema of `stratus.toml`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{StratusError, StratusResult};

/// Contents of a `stratus.toml` file, either project level or user level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StratusConfig {
    #[serde(default)]
    pub project: ProjectSection,

    /// Service sid deployed for each account, keyed by account sid.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub services: BTreeMap<String, String>,
}

/// The `[project]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    /// Unique name of the service. Falls back to the `package.json` name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    /// Domain suffix of the default environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<String>,
}

impl StratusConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service sid recorded for an account.
    pub fn service_sid(&self, account_sid: &str) -> Option<&str> {
        self.services.get(account_sid).map(String::as_str)
    }

    pub fn set_service_sid(
        &mut self,
        account_sid: impl Into<String>,
        service_sid: impl Into<String>,
    ) {
        self.services.insert(account_sid.into(), service_sid.into());
    }

    /// Fill unset project settings from `defaults`.
    pub fn with_defaults(mut self, defaults: &StratusConfig) -> Self {
        let project = &mut self.project;
        let fallback = &defaults.project;
        fill(&mut project.service_name, &fallback.service_name);
        fill(&mut project.environment, &fallback.environment);
        fill(&mut project.functions_dir, &fallback.functions_dir);
        fill(&mut project.assets_dir, &fallback.assets_dir);
        fill(&mut project.region, &fallback.region);
        fill(&mut project.edge, &fallback.edge);
        self
    }

    pub fn validate(&self) -> StratusResult<()> {
        if let Some(env) = &self.project.environment {
            if env.chars().any(char::is_whitespace) {
                return Err(StratusError::configuration(format!(
                    "Invalid environment \"{}\": domain suffixes cannot contain whitespace",
                    env
                )));
            }
        }

        if let Some(name) = &self.project.service_name {
            if name.trim().is_empty() {
                return Err(StratusError::configuration("service_name cannot be empty"));
            }
        }

        for (account, service) in &self.services {
            if !account.starts_with("AC") {
                return Err(StratusError::configuration(format!(
                    "Invalid [services] key \"{}\": expected an account sid starting with AC",
                    account
                )));
            }
            if !service.starts_with("ZS") {
                return Err(StratusError::configuration(format!(
                    "Invalid service sid \"{}\" for account {}",
                    service, account
                )));
            }
        }

        Ok(())
    }
}

fn fill(slot: &mut Option<String>, fallback: &Option<String>) {
    if slot.is_none() {
        slot.clone_from(fallback);
    }
}
