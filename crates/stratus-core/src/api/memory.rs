//! In-process platform used for tests and dry runs.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{StratusError, StratusResult};
use crate::types::{BuildManifest, ResourceKind, Visibility};

use super::ServerlessApi;
use super::types::{
    BuildResource, BuildStatus, DeploymentResource, EnvironmentResource, RemoteResource,
    ServiceResource, UploadTarget, VariableResource, VersionResource,
};

const UPLOAD_SCHEME: &str = "memory://uploads/";

/// A call received by [`MemoryApi`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    ListServices,
    CreateService { unique_name: String },
    ListEnvironments,
    CreateEnvironment { unique_name: String },
    ListResources { kind: ResourceKind },
    CreateResource { kind: ResourceKind, name: String },
    CreateVersion { kind: ResourceKind, name: String, path: String },
    Upload { version_sid: String, bytes: usize },
    CreateBuild { manifest: BuildManifest },
    GetBuild { build_sid: String },
    ListBuilds,
    CreateDeployment { environment_sid: String, build_sid: String },
    ListVariables,
    CreateVariable { key: String, value: String },
    UpdateVariable { key: String, value: String },
    DeleteVariable { key: String },
}

/// Operations that can be made to fail on purpose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailPoint {
    CreateService,
    CreateEnvironment,
    /// Registering the resource with this friendly name.
    CreateResource(String),
    /// Creating a version of the resource with this friendly name.
    CreateVersion(String),
    Upload,
    CreateBuild,
    GetBuild,
    CreateDeployment,
}

#[derive(Debug, Default)]
struct MemoryState {
    counter: u64,
    calls: Vec<ApiCall>,
    failures: Vec<FailPoint>,
    build_script: Vec<BuildStatus>,
    build_latency: Option<Duration>,
    services: Vec<ServiceResource>,
    environments: Vec<EnvironmentResource>,
    resources: HashMap<ResourceKind, Vec<RemoteResource>>,
    versions: HashMap<String, String>,
    uploads: HashMap<String, Vec<u8>>,
    builds: Vec<BuildResource>,
    build_polls: HashMap<String, usize>,
    deployments: Vec<DeploymentResource>,
    variables: Vec<VariableResource>,
}

impl MemoryState {
    fn next_sid(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{}{:032x}", prefix, self.counter)
    }

    fn record(&mut self, call: ApiCall) {
        self.calls.push(call);
    }

    fn check(&self, point: FailPoint) -> StratusResult<()> {
        if self.failures.contains(&point) {
            return Err(StratusError::api(500, format!("injected failure: {:?}", point)));
        }
        Ok(())
    }

    fn resource_name(&self, kind: ResourceKind, sid: &str) -> Option<String> {
        self.resources
            .get(&kind)
            .and_then(|list| list.iter().find(|r| r.sid == sid))
            .map(|r| r.friendly_name.clone())
    }
}

/// [`ServerlessApi`] that keeps all platform state in memory.
///
/// Builds walk through the configured status script, one entry per poll,
/// staying on the last entry. The default script is `PENDING`, `VERIFIED`.
#[derive(Debug)]
pub struct MemoryApi {
    state: Mutex<MemoryState>,
}

impl MemoryApi {
    pub fn new() -> Self {
        let state = MemoryState {
            build_script: vec![BuildStatus::Pending, BuildStatus::Verified],
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// Status sequence every new build reports while being polled.
    pub fn with_build_statuses(self, statuses: Vec<BuildStatus>) -> Self {
        self.lock().build_script = statuses;
        self
    }

    /// Delay every build status read, as a slow platform would.
    pub fn with_build_latency(self, latency: Duration) -> Self {
        self.lock().build_latency = Some(latency);
        self
    }

    pub fn fail_on(&self, point: FailPoint) {
        self.lock().failures.push(point);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Number of recorded calls matching a predicate.
    pub fn count(&self, predicate: impl Fn(&ApiCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(*call)).count()
    }

    /// Content uploaded for a version, if any.
    pub fn uploaded(&self, version_sid: &str) -> Option<Vec<u8>> {
        self.lock().uploads.get(version_sid).cloned()
    }

    pub fn services(&self) -> Vec<ServiceResource> {
        self.lock().services.clone()
    }

    pub fn environments(&self) -> Vec<EnvironmentResource> {
        self.lock().environments.clone()
    }

    pub fn deployments(&self) -> Vec<DeploymentResource> {
        self.lock().deployments.clone()
    }

    pub fn variables(&self) -> Vec<VariableResource> {
        self.lock().variables.clone()
    }

    /// Register a function or asset directly, bypassing the call log.
    pub fn seed_resource(&self, service_sid: &str, kind: ResourceKind, name: &str) -> String {
        let mut state = self.lock();
        let sid = state.next_sid("ZH");
        let resource = RemoteResource {
            sid: sid.clone(),
            service_sid: service_sid.to_string(),
            friendly_name: name.to_string(),
            date_created: Some(Utc::now()),
            date_updated: None,
        };
        state.resources.entry(kind).or_default().push(resource);
        sid
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServerlessApi for MemoryApi {
    async fn list_services(&self) -> StratusResult<Vec<ServiceResource>> {
        let mut state = self.lock();
        state.record(ApiCall::ListServices);
        Ok(state.services.clone())
    }

    async fn create_service(&self, unique_name: &str) -> StratusResult<ServiceResource> {
        let mut state = self.lock();
        state.record(ApiCall::CreateService {
            unique_name: unique_name.to_string(),
        });
        state.check(FailPoint::CreateService)?;
        if state.services.iter().any(|s| s.unique_name == unique_name) {
            return Err(StratusError::api(409, "Service already exists"));
        }
        let service = ServiceResource {
            sid: state.next_sid("ZS"),
            unique_name: unique_name.to_string(),
            friendly_name: unique_name.to_string(),
            date_created: Some(Utc::now()),
            date_updated: None,
        };
        state.services.push(service.clone());
        Ok(service)
    }

    async fn list_environments(
        &self,
        service_sid: &str,
    ) -> StratusResult<Vec<EnvironmentResource>> {
        let mut state = self.lock();
        state.record(ApiCall::ListEnvironments);
        Ok(state
            .environments
            .iter()
            .filter(|e| e.service_sid == service_sid)
            .cloned()
            .collect())
    }

    async fn create_environment(
        &self,
        service_sid: &str,
        unique_name: &str,
        domain_suffix: &str,
    ) -> StratusResult<EnvironmentResource> {
        let mut state = self.lock();
        state.record(ApiCall::CreateEnvironment {
            unique_name: unique_name.to_string(),
        });
        state.check(FailPoint::CreateEnvironment)?;
        if state
            .environments
            .iter()
            .any(|e| e.service_sid == service_sid && e.unique_name == unique_name)
        {
            return Err(StratusError::api(409, "Environment already exists"));
        }
        let service_name = state
            .services
            .iter()
            .find(|s| s.sid == service_sid)
            .map(|s| s.unique_name.clone())
            .ok_or_else(|| StratusError::api(404, "Service not found"))?;
        let domain_name = if domain_suffix.is_empty() {
            format!("{}.memory.local", service_name)
        } else {
            format!("{}-{}.memory.local", service_name, domain_suffix)
        };
        let environment = EnvironmentResource {
            sid: state.next_sid("ZE"),
            service_sid: service_sid.to_string(),
            unique_name: unique_name.to_string(),
            domain_suffix: (!domain_suffix.is_empty()).then(|| domain_suffix.to_string()),
            domain_name,
            build_sid: None,
            date_created: Some(Utc::now()),
            date_updated: None,
        };
        state.environments.push(environment.clone());
        Ok(environment)
    }

    async fn list_resources(
        &self,
        service_sid: &str,
        kind: ResourceKind,
    ) -> StratusResult<Vec<RemoteResource>> {
        let mut state = self.lock();
        state.record(ApiCall::ListResources { kind });
        Ok(state
            .resources
            .get(&kind)
            .map(|list| {
                list.iter()
                    .filter(|r| r.service_sid == service_sid)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_resource(
        &self,
        service_sid: &str,
        kind: ResourceKind,
        friendly_name: &str,
    ) -> StratusResult<RemoteResource> {
        let mut state = self.lock();
        state.record(ApiCall::CreateResource {
            kind,
            name: friendly_name.to_string(),
        });
        state.check(FailPoint::CreateResource(friendly_name.to_string()))?;
        let resource = RemoteResource {
            sid: state.next_sid("ZH"),
            service_sid: service_sid.to_string(),
            friendly_name: friendly_name.to_string(),
            date_created: Some(Utc::now()),
            date_updated: None,
        };
        state
            .resources
            .entry(kind)
            .or_default()
            .push(resource.clone());
        Ok(resource)
    }

    async fn create_version(
        &self,
        _service_sid: &str,
        kind: ResourceKind,
        resource_sid: &str,
        path: &str,
        visibility: Visibility,
    ) -> StratusResult<VersionResource> {
        let mut state = self.lock();
        let name = state
            .resource_name(kind, resource_sid)
            .ok_or_else(|| StratusError::api(404, format!("{} not found", kind)))?;
        state.record(ApiCall::CreateVersion {
            kind,
            name: name.clone(),
            path: path.to_string(),
        });
        state.check(FailPoint::CreateVersion(name))?;
        let sid = state.next_sid("ZN");
        state.versions.insert(sid.clone(), resource_sid.to_string());
        Ok(VersionResource {
            pre_signed_upload_url: UploadTarget {
                url: format!("{}{}", UPLOAD_SCHEME, sid),
                kms_arn: "arn:memory:kms".to_string(),
            },
            sid,
            path: path.to_string(),
            visibility: Some(visibility.as_str().to_string()),
        })
    }

    async fn upload_content(&self, target: &UploadTarget, content: Vec<u8>) -> StratusResult<()> {
        let mut state = self.lock();
        let version_sid = target
            .url
            .strip_prefix(UPLOAD_SCHEME)
            .unwrap_or(&target.url)
            .to_string();
        state.record(ApiCall::Upload {
            version_sid: version_sid.clone(),
            bytes: content.len(),
        });
        state.check(FailPoint::Upload)?;
        if state.uploads.contains_key(&version_sid) {
            return Err(StratusError::api(403, "upload target already used"));
        }
        state.uploads.insert(version_sid, content);
        Ok(())
    }

    async fn create_build(
        &self,
        service_sid: &str,
        manifest: &BuildManifest,
    ) -> StratusResult<BuildResource> {
        let mut state = self.lock();
        state.record(ApiCall::CreateBuild {
            manifest: manifest.clone(),
        });
        state.check(FailPoint::CreateBuild)?;
        let unknown = manifest
            .function_versions
            .iter()
            .chain(&manifest.asset_versions)
            .find(|sid| !state.versions.contains_key(*sid));
        if let Some(sid) = unknown {
            return Err(StratusError::api(400, format!("unknown version {}", sid)));
        }
        let status = state
            .build_script
            .first()
            .cloned()
            .unwrap_or(BuildStatus::Verified);
        let build = BuildResource {
            sid: state.next_sid("ZB"),
            service_sid: service_sid.to_string(),
            status,
            date_created: Some(Utc::now()),
            date_updated: None,
        };
        state.builds.push(build.clone());
        Ok(build)
    }

    async fn get_build(&self, service_sid: &str, build_sid: &str) -> StratusResult<BuildResource> {
        let latency = self.lock().build_latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        state.record(ApiCall::GetBuild {
            build_sid: build_sid.to_string(),
        });
        state.check(FailPoint::GetBuild)?;

        let polls = state.build_polls.entry(build_sid.to_string()).or_default();
        let index = *polls;
        *polls += 1;

        let script_len = state.build_script.len();
        let status = if script_len == 0 {
            BuildStatus::Verified
        } else {
            state.build_script[index.min(script_len - 1)].clone()
        };

        let build = state
            .builds
            .iter_mut()
            .find(|b| b.sid == build_sid && b.service_sid == service_sid)
            .ok_or_else(|| StratusError::api(404, "Build not found"))?;
        build.status = status;
        build.date_updated = Some(Utc::now());
        Ok(build.clone())
    }

    async fn list_builds(&self, service_sid: &str) -> StratusResult<Vec<BuildResource>> {
        let mut state = self.lock();
        state.record(ApiCall::ListBuilds);
        Ok(state
            .builds
            .iter()
            .filter(|b| b.service_sid == service_sid)
            .cloned()
            .collect())
    }

    async fn create_deployment(
        &self,
        service_sid: &str,
        environment_sid: &str,
        build_sid: &str,
    ) -> StratusResult<DeploymentResource> {
        let mut state = self.lock();
        state.record(ApiCall::CreateDeployment {
            environment_sid: environment_sid.to_string(),
            build_sid: build_sid.to_string(),
        });
        state.check(FailPoint::CreateDeployment)?;
        if !state.builds.iter().any(|b| b.sid == build_sid) {
            return Err(StratusError::api(404, "Build not found"));
        }
        let sid = state.next_sid("ZD");
        let environment = state
            .environments
            .iter_mut()
            .find(|e| e.sid == environment_sid && e.service_sid == service_sid)
            .ok_or_else(|| StratusError::api(404, "Environment not found"))?;
        environment.build_sid = Some(build_sid.to_string());
        environment.date_updated = Some(Utc::now());

        let deployment = DeploymentResource {
            sid,
            service_sid: service_sid.to_string(),
            environment_sid: environment_sid.to_string(),
            build_sid: build_sid.to_string(),
            date_created: Some(Utc::now()),
        };
        state.deployments.push(deployment.clone());
        Ok(deployment)
    }

    async fn list_variables(
        &self,
        service_sid: &str,
        environment_sid: &str,
    ) -> StratusResult<Vec<VariableResource>> {
        let mut state = self.lock();
        state.record(ApiCall::ListVariables);
        Ok(state
            .variables
            .iter()
            .filter(|v| v.service_sid == service_sid && v.environment_sid == environment_sid)
            .cloned()
            .collect())
    }

    async fn create_variable(
        &self,
        service_sid: &str,
        environment_sid: &str,
        key: &str,
        value: &str,
    ) -> StratusResult<VariableResource> {
        let mut state = self.lock();
        state.record(ApiCall::CreateVariable {
            key: key.to_string(),
            value: value.to_string(),
        });
        if state.variables.iter().any(|v| {
            v.service_sid == service_sid && v.environment_sid == environment_sid && v.key == key
        }) {
            return Err(StratusError::api(409, format!("Variable {} already exists", key)));
        }
        let variable = VariableResource {
            sid: state.next_sid("ZV"),
            service_sid: service_sid.to_string(),
            environment_sid: environment_sid.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        };
        state.variables.push(variable.clone());
        Ok(variable)
    }

    async fn update_variable(
        &self,
        service_sid: &str,
        environment_sid: &str,
        variable_sid: &str,
        value: &str,
    ) -> StratusResult<VariableResource> {
        let mut state = self.lock();
        let variable = state
            .variables
            .iter_mut()
            .find(|v| {
                v.sid == variable_sid
                    && v.service_sid == service_sid
                    && v.environment_sid == environment_sid
            })
            .ok_or_else(|| StratusError::api(404, "Variable not found"))?;
        variable.value = value.to_string();
        let updated = variable.clone();
        state.record(ApiCall::UpdateVariable {
            key: updated.key.clone(),
            value: value.to_string(),
        });
        Ok(updated)
    }

    async fn delete_variable(
        &self,
        service_sid: &str,
        environment_sid: &str,
        variable_sid: &str,
    ) -> StratusResult<()> {
        let mut state = self.lock();
        let index = state
            .variables
            .iter()
            .position(|v| {
                v.sid == variable_sid
                    && v.service_sid == service_sid
                    && v.environment_sid == environment_sid
            })
            .ok_or_else(|| StratusError::api(404, "Variable not found"))?;
        let removed = state.variables.remove(index);
        state.record(ApiCall::DeleteVariable { key: removed.key });
        Ok(())
    }
}
