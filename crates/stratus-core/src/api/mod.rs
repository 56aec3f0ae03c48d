//! Access to the hosting platform's control plane.
//!
//! [`ServerlessApi`] is the seam between the deploy pipeline and the network.
//! [`HttpApi`] talks to the real platform; [`MemoryApi`] keeps everything in
//! process and records each call, for tests and dry runs.

pub mod http;
pub mod memory;
pub mod types;

use async_trait::async_trait;

use crate::error::StratusResult;
use crate::types::{BuildManifest, ResourceKind, Visibility};

pub use http::{ApiConfig, HttpApi};
pub use memory::{ApiCall, FailPoint, MemoryApi};
pub use types::{
    BuildResource, BuildStatus, DeploymentResource, EnvironmentResource, RemoteResource,
    ServiceResource, UploadTarget, VariableResource, VersionResource,
};

#[async_trait]
pub trait ServerlessApi: Send + Sync {
    async fn list_services(&self) -> StratusResult<Vec<ServiceResource>>;

    async fn create_service(&self, unique_name: &str) -> StratusResult<ServiceResource>;

    async fn list_environments(&self, service_sid: &str)
    -> StratusResult<Vec<EnvironmentResource>>;

    /// An empty `domain_suffix` creates the suffix-less production environment.
    async fn create_environment(
        &self,
        service_sid: &str,
        unique_name: &str,
        domain_suffix: &str,
    ) -> StratusResult<EnvironmentResource>;

    async fn list_resources(
        &self,
        service_sid: &str,
        kind: ResourceKind,
    ) -> StratusResult<Vec<RemoteResource>>;

    async fn create_resource(
        &self,
        service_sid: &str,
        kind: ResourceKind,
        friendly_name: &str,
    ) -> StratusResult<RemoteResource>;

    async fn create_version(
        &self,
        service_sid: &str,
        kind: ResourceKind,
        resource_sid: &str,
        path: &str,
        visibility: Visibility,
    ) -> StratusResult<VersionResource>;

    /// Transfer content to a single-use upload target.
    async fn upload_content(&self, target: &UploadTarget, content: Vec<u8>) -> StratusResult<()>;

    async fn create_build(
        &self,
        service_sid: &str,
        manifest: &BuildManifest,
    ) -> StratusResult<BuildResource>;

    async fn get_build(&self, service_sid: &str, build_sid: &str) -> StratusResult<BuildResource>;

    async fn list_builds(&self, service_sid: &str) -> StratusResult<Vec<BuildResource>>;

    async fn create_deployment(
        &self,
        service_sid: &str,
        environment_sid: &str,
        build_sid: &str,
    ) -> StratusResult<DeploymentResource>;

    async fn list_variables(
        &self,
        service_sid: &str,
        environment_sid: &str,
    ) -> StratusResult<Vec<VariableResource>>;

    async fn create_variable(
        &self,
        service_sid: &str,
        environment_sid: &str,
        key: &str,
        value: &str,
    ) -> StratusResult<VariableResource>;

    async fn update_variable(
        &self,
        service_sid: &str,
        environment_sid: &str,
        variable_sid: &str,
        value: &str,
    ) -> StratusResult<VariableResource>;

    async fn delete_variable(
        &self,
        service_sid: &str,
        environment_sid: &str,
        variable_sid: &str,
    ) -> StratusResult<()>;
}
