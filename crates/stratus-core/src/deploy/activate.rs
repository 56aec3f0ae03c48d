//! Make a build live on an environment.

use tracing::debug;

use crate::api::{BuildStatus, DeploymentResource, EnvironmentResource, ServerlessApi};
use crate::error::{StratusError, StratusResult};

/// Point `environment_sid` at `build_sid`.
pub async fn activate(
    api: &dyn ServerlessApi,
    service_sid: &str,
    environment_sid: &str,
    build_sid: &str,
) -> StratusResult<DeploymentResource> {
    debug!(build = %build_sid, environment = %environment_sid, "activating build");
    api.create_deployment(service_sid, environment_sid, build_sid)
        .await
}

/// Find an environment of a service by sid, domain suffix or unique name.
pub async fn find_environment(
    api: &dyn ServerlessApi,
    service_sid: &str,
    key: &str,
) -> StratusResult<EnvironmentResource> {
    api.list_environments(service_sid)
        .await?
        .into_iter()
        .find(|env| env.matches(key))
        .ok_or_else(|| StratusError::EnvironmentNotFound(key.to_string()))
}

/// The build live on `source`, verified to exist and be usable.
pub async fn build_of_environment(
    api: &dyn ServerlessApi,
    service_sid: &str,
    source: &EnvironmentResource,
) -> StratusResult<String> {
    let build_sid = source.build_sid.clone().ok_or_else(|| {
        StratusError::configuration(format!(
            "environment {} has no active build",
            source.unique_name
        ))
    })?;

    let build = api.get_build(service_sid, &build_sid).await?;
    if build.status == BuildStatus::Failed {
        return Err(StratusError::BuildFailed { build_sid });
    }
    Ok(build_sid)
}
