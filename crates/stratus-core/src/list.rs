//! Inspect what is deployed on the platform.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::api::{
    BuildResource, EnvironmentResource, RemoteResource, ServerlessApi, ServiceResource,
    VariableResource,
};
use crate::deploy::activate::find_environment;
use crate::deploy::environment::find_service;
use crate::error::{StratusError, StratusResult};
use crate::types::ResourceKind;

/// A category of remote resource that can be listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Services,
    Environments,
    Functions,
    Assets,
    Variables,
    Builds,
}

impl ListType {
    pub const ALL: [ListType; 6] = [
        Self::Services,
        Self::Environments,
        Self::Functions,
        Self::Assets,
        Self::Variables,
        Self::Builds,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Services => "services",
            Self::Environments => "environments",
            Self::Functions => "functions",
            Self::Assets => "assets",
            Self::Variables => "variables",
            Self::Builds => "builds",
        }
    }

    fn needs_service(self) -> bool {
        !matches!(self, Self::Services)
    }
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListType {
    type Err = StratusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| {
                StratusError::configuration(format!(
                    "unknown list type \"{}\" (expected one of: services, environments, functions, assets, variables, builds)",
                    s
                ))
            })
    }
}

/// What to list.
#[derive(Debug, Clone, Default)]
pub struct ListConfig {
    /// Service sid, or unique name when no sid is known.
    pub service: Option<String>,
    /// Environment to read variables from, by sid or domain suffix.
    pub environment: Option<String>,
    pub types: Vec<ListType>,
}

/// Listed resources. Only the requested categories are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<ServiceResource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environments: Option<Vec<EnvironmentResource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<RemoteResource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<Vec<RemoteResource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<VariableResource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builds: Option<Vec<BuildResource>>,
}

/// List the requested categories of resources.
///
/// Everything except services is scoped to `config.service`. Variables also
/// need `config.environment`.
pub async fn list_resources(
    api: &dyn ServerlessApi,
    config: &ListConfig,
) -> StratusResult<ListResult> {
    let mut result = ListResult::default();
    if config.types.is_empty() {
        return Ok(result);
    }

    let service_sid = if config.types.iter().any(|t| t.needs_service()) {
        let key = config.service.as_deref().ok_or_else(|| {
            StratusError::configuration("a service sid or name is required to list its resources")
        })?;
        let service = find_service(api, key)
            .await?
            .ok_or_else(|| StratusError::ServiceNotFound(key.to_string()))?;
        Some(service.sid)
    } else {
        None
    };
    let service_sid = service_sid.as_deref().unwrap_or_default();

    for list_type in &config.types {
        debug!(%list_type, "listing");
        match list_type {
            ListType::Services => result.services = Some(api.list_services().await?),
            ListType::Environments => {
                result.environments = Some(api.list_environments(service_sid).await?)
            }
            ListType::Functions => {
                result.functions =
                    Some(api.list_resources(service_sid, ResourceKind::Function).await?)
            }
            ListType::Assets => {
                result.assets = Some(api.list_resources(service_sid, ResourceKind::Asset).await?)
            }
            ListType::Builds => result.builds = Some(api.list_builds(service_sid).await?),
            ListType::Variables => {
                let key = config.environment.as_deref().ok_or_else(|| {
                    StratusError::configuration("an environment is required to list variables")
                })?;
                let environment = find_environment(api, service_sid, key).await?;
                result.variables =
                    Some(api.list_variables(service_sid, &environment.sid).await?);
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_types_parse_case_insensitively() {
        assert_eq!("Functions".parse::<ListType>().unwrap(), ListType::Functions);
        assert_eq!(" builds ".parse::<ListType>().unwrap(), ListType::Builds);
        assert!("routes".parse::<ListType>().is_err());
    }
}
