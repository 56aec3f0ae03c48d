//! The deployment orchestrator.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use crate::api::{DeploymentResource, ServerlessApi};
use crate::error::{StratusError, StratusResult};
use crate::fs::{ListingOptions, list_project_files};
use crate::progress::{DeployStatus, ProgressEvent, ProgressReporter};
use crate::types::{
    BuildManifest, Dependency, DeployResult, DeployedResource, FileInfo, ResourceKind,
};

use super::activate::{activate, build_of_environment, find_environment};
use super::build::{BuildPoller, PollConfig, trigger};
use super::environment::{ensure_environment, ensure_service, require_service};
use super::reconcile::get_or_create_resources;
use super::upload::upload_all;
use super::variables::{EnvVars, set_all};

/// Inputs of a deployment whose files are already known.
#[derive(Debug, Clone, Default)]
pub struct DeployProjectConfig {
    /// Existing service to deploy into. When absent, the service named
    /// `service_name` is reused or created.
    pub service_sid: Option<String>,
    pub service_name: String,
    /// Domain suffix of the target environment. Empty targets production.
    pub environment: String,
    pub functions: Vec<FileInfo>,
    pub assets: Vec<FileInfo>,
    pub dependencies: Vec<Dependency>,
    pub env: EnvVars,
}

/// Inputs of a deployment read from a project directory.
#[derive(Debug, Clone, Default)]
pub struct DeployLocalProjectConfig {
    pub root: PathBuf,
    pub listing: ListingOptions,
    /// Everything except the file lists, which are read from `root`.
    pub project: DeployProjectConfig,
}

/// Which build to promote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildSource {
    /// A build sid.
    Build(String),
    /// The build currently live on an environment, by sid or domain suffix.
    Environment(String),
}

/// Inputs of a promotion of an existing build.
#[derive(Debug, Clone)]
pub struct PromoteConfig {
    pub service_sid: String,
    pub source: BuildSource,
    /// Target environment, by sid or domain suffix.
    pub target_environment: String,
    /// Create the target environment when it does not exist.
    pub create_environment: bool,
    /// Set before activating.
    pub env: EnvVars,
}

/// Outcome of a promotion.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PromoteResult {
    pub service_sid: String,
    pub environment_sid: String,
    pub build_sid: String,
    pub deployment_sid: String,
    pub domain: String,
}

/// Drives deployments against a platform and reports their progress.
///
/// The client holds no per-deployment state; it can be shared and reused.
#[derive(Clone)]
pub struct DeployClient {
    api: Arc<dyn ServerlessApi>,
    reporter: ProgressReporter,
    poll: PollConfig,
}

impl DeployClient {
    pub fn new(api: Arc<dyn ServerlessApi>) -> Self {
        Self {
            api,
            reporter: ProgressReporter::new(),
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Receive progress events from every deployment started after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.reporter.subscribe()
    }

    /// Deploy the given files and activate the resulting build.
    ///
    /// Stages run strictly in order and each one announces itself before it
    /// starts. Nothing created before a failure is rolled back.
    pub async fn deploy_project(&self, config: DeployProjectConfig) -> StratusResult<DeployResult> {
        let api = self.api.as_ref();
        let progress = &self.reporter;

        let service_sid = match &config.service_sid {
            Some(sid) => sid.clone(),
            None => {
                if config.service_name.trim().is_empty() {
                    return Err(StratusError::configuration(
                        "a service name is required when no service sid is configured",
                    ));
                }
                progress.update(DeployStatus::CreatingService, "Creating Service");
                let service = ensure_service(api, &config.service_name).await?;
                info!(service = %service.sid, created = service.created, "service ready");
                service.sid
            }
        };

        progress.update(
            DeployStatus::ConfiguringEnvironment,
            format!("Configuring \"{}\" environment", config.environment),
        );
        let environment = ensure_environment(api, &service_sid, &config.environment).await?;
        info!(
            environment = %environment.sid,
            domain = %environment.domain_name,
            "environment ready"
        );

        progress.update(
            DeployStatus::CreatingFunctions,
            format!("Creating {} Functions", config.functions.len()),
        );
        let functions =
            get_or_create_resources(api, &service_sid, ResourceKind::Function, config.functions)
                .await?;

        progress.update(
            DeployStatus::UploadingFunctions,
            format!("Uploading {} Functions", functions.len()),
        );
        let function_versions =
            upload_all(api, &service_sid, ResourceKind::Function, &functions).await?;

        progress.update(
            DeployStatus::CreatingAssets,
            format!("Creating {} Assets", config.assets.len()),
        );
        let assets =
            get_or_create_resources(api, &service_sid, ResourceKind::Asset, config.assets).await?;

        progress.update(
            DeployStatus::UploadingAssets,
            format!("Uploading {} Assets", assets.len()),
        );
        let asset_versions = upload_all(api, &service_sid, ResourceKind::Asset, &assets).await?;

        progress.update(DeployStatus::Building, "Waiting for deployment.");
        let manifest = BuildManifest {
            function_versions,
            asset_versions,
            dependencies: config.dependencies,
        };
        let build = trigger(api, &service_sid, &manifest).await?;
        info!(build = %build.sid, "build triggered");
        BuildPoller::new(api, progress, self.poll)
            .wait(&service_sid, &build.sid)
            .await?;

        progress.update(DeployStatus::SettingVariables, "Setting environment variables");
        set_all(api, &service_sid, &environment.sid, &config.env).await?;

        progress.update(DeployStatus::ActivatingDeployment, "Activating deployment");
        activate(api, &service_sid, &environment.sid, &build.sid).await?;

        progress.finish(DeployStatus::Done, "Project successfully deployed");
        info!(build = %build.sid, domain = %environment.domain_name, "deployment complete");

        let domain = environment.domain_name;
        Ok(DeployResult {
            function_resources: functions
                .iter()
                .map(|r| DeployedResource::new(r, &domain))
                .collect(),
            asset_resources: assets
                .iter()
                .map(|r| DeployedResource::new(r, &domain))
                .collect(),
            service_sid,
            environment_sid: environment.sid,
            build_sid: build.sid,
            domain,
        })
    }

    /// Read the project directory, then deploy its files.
    pub async fn deploy_local_project(
        &self,
        config: DeployLocalProjectConfig,
    ) -> StratusResult<DeployResult> {
        self.reporter.update(
            DeployStatus::ReadingFilesystem,
            "Gathering Functions and Assets to deploy",
        );

        let files = list_project_files(&config.root, &config.listing)?;
        info!(
            functions = files.functions.len(),
            assets = files.assets.len(),
            root = %config.root.display(),
            "read project files"
        );

        self.deploy_project(DeployProjectConfig {
            functions: files.functions,
            assets: files.assets,
            ..config.project
        })
        .await
    }

    /// Activate an existing build on an environment without rebuilding.
    pub async fn promote(&self, config: PromoteConfig) -> StratusResult<PromoteResult> {
        let api = self.api.as_ref();
        let progress = &self.reporter;
        require_service(api, &config.service_sid).await?;

        let build_sid = match &config.source {
            BuildSource::Build(sid) => sid.clone(),
            BuildSource::Environment(key) => {
                let source = find_environment(api, &config.service_sid, key).await?;
                build_of_environment(api, &config.service_sid, &source).await?
            }
        };

        progress.update(
            DeployStatus::ConfiguringEnvironment,
            format!("Configuring \"{}\" environment", config.target_environment),
        );
        let target = match find_environment(api, &config.service_sid, &config.target_environment)
            .await
        {
            Ok(env) => env,
            Err(StratusError::EnvironmentNotFound(_)) if config.create_environment => {
                ensure_environment(api, &config.service_sid, &config.target_environment).await?
            }
            Err(err) => return Err(err),
        };

        if !config.env.is_empty() {
            progress.update(DeployStatus::SettingVariables, "Setting environment variables");
            set_all(api, &config.service_sid, &target.sid, &config.env).await?;
        }

        progress.update(DeployStatus::ActivatingDeployment, "Activating deployment");
        let DeploymentResource { sid, .. } =
            activate(api, &config.service_sid, &target.sid, &build_sid).await?;
        progress.finish(DeployStatus::Done, "Build successfully promoted");
        info!(build = %build_sid, environment = %target.sid, "promotion complete");

        Ok(PromoteResult {
            service_sid: config.service_sid,
            environment_sid: target.sid,
            build_sid,
            deployment_sid: sid,
            domain: target.domain_name,
        })
    }
}
