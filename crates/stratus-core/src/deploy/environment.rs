//! Provision the service and environment a deployment targets.

use tracing::{debug, warn};

use crate::api::{EnvironmentResource, ServerlessApi, ServiceResource};
use crate::error::{StratusError, StratusResult};

/// Unique name of the environment with the given domain suffix.
pub fn environment_unique_name(domain_suffix: &str) -> String {
    format!("{}-environment", domain_suffix)
}

/// Outcome of resolving the target service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedService {
    pub sid: String,
    /// Whether the service was created by this call.
    pub created: bool,
}

/// Look up a service by unique name.
pub async fn find_service(
    api: &dyn ServerlessApi,
    unique_name: &str,
) -> StratusResult<Option<ServiceResource>> {
    Ok(api
        .list_services()
        .await?
        .into_iter()
        .find(|s| s.unique_name == unique_name || s.sid == unique_name))
}

/// Reuse the service called `unique_name`, or create it.
pub async fn ensure_service(
    api: &dyn ServerlessApi,
    unique_name: &str,
) -> StratusResult<ResolvedService> {
    if let Some(existing) = find_service(api, unique_name).await? {
        debug!(service = %existing.sid, "reusing existing service");
        return Ok(ResolvedService {
            sid: existing.sid,
            created: false,
        });
    }

    let service = api.create_service(unique_name).await?;
    Ok(ResolvedService {
        sid: service.sid,
        created: true,
    })
}

/// Create the environment for `domain_suffix`, or fetch it if it already exists.
pub async fn ensure_environment(
    api: &dyn ServerlessApi,
    service_sid: &str,
    domain_suffix: &str,
) -> StratusResult<EnvironmentResource> {
    let unique_name = environment_unique_name(domain_suffix);

    match api
        .create_environment(service_sid, &unique_name, domain_suffix)
        .await
    {
        Ok(environment) => Ok(environment),
        Err(err) => {
            warn!(error = %err, %unique_name, "environment creation failed, looking up existing");
            api.list_environments(service_sid)
                .await?
                .into_iter()
                .find(|env| env.unique_name == unique_name)
                .ok_or(err)
        }
    }
}

/// Verify a configured service sid still exists.
pub async fn require_service(api: &dyn ServerlessApi, service_sid: &str) -> StratusResult<()> {
    find_service(api, service_sid)
        .await?
        .map(|_| ())
        .ok_or_else(|| StratusError::ServiceNotFound(service_sid.to_string()))
}
