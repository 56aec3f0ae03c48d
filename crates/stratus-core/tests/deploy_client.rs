//! End-to-end deployments against the in-memory platform.

mod support;

use std::sync::Arc;

use stratus_core::api::{ApiCall, BuildStatus, FailPoint, MemoryApi, ServerlessApi};
use stratus_core::deploy::{DeployClient, DeployProjectConfig};
use stratus_core::error::StratusError;
use stratus_core::progress::{DeployStatus, EventKind, drain};
use stratus_core::types::{Dependency, FileInfo, ResourceKind, Visibility};

use support::{FUNCTION_SOURCE, STYLESHEET, sample_project, statuses, vars};

fn is_create(call: &ApiCall) -> bool {
    matches!(call, ApiCall::CreateResource { .. })
}

fn is_upload(call: &ApiCall) -> bool {
    matches!(call, ApiCall::Upload { .. })
}

fn is_build(call: &ApiCall) -> bool {
    matches!(call, ApiCall::CreateBuild { .. })
}

#[tokio::test(start_paused = true)]
async fn first_deploy_creates_uploads_builds_and_activates() {
    let api = Arc::new(MemoryApi::new());
    let client = DeployClient::new(api.clone());
    let mut rx = client.subscribe();

    let result = client.deploy_project(sample_project()).await.unwrap();

    assert_eq!(
        api.count(|c| matches!(c, ApiCall::CreateResource { kind: ResourceKind::Function, .. })),
        1
    );
    assert_eq!(
        api.count(|c| matches!(c, ApiCall::CreateResource { kind: ResourceKind::Asset, .. })),
        1
    );
    assert_eq!(api.count(is_upload), 2);
    assert_eq!(api.count(is_build), 1);
    assert_eq!(api.count(|c| matches!(c, ApiCall::GetBuild { .. })), 2);
    assert_eq!(api.count(|c| matches!(c, ApiCall::CreateDeployment { .. })), 1);

    let manifest = api
        .calls()
        .into_iter()
        .find_map(|c| match c {
            ApiCall::CreateBuild { manifest } => Some(manifest),
            _ => None,
        })
        .unwrap();
    assert_eq!(manifest.function_versions.len(), 1);
    assert_eq!(manifest.asset_versions.len(), 1);
    assert_eq!(
        api.uploaded(&manifest.function_versions[0]).unwrap(),
        FUNCTION_SOURCE.as_bytes()
    );
    assert_eq!(
        api.uploaded(&manifest.asset_versions[0]).unwrap(),
        STYLESHEET.as_bytes()
    );

    let variables = api.variables();
    assert_eq!(variables.len(), 1);
    assert_eq!(variables[0].key, "GREETING");
    assert_eq!(variables[0].environment_sid, result.environment_sid);

    let deployments = api.deployments();
    assert_eq!(deployments.len(), 1);
    assert_eq!(deployments[0].build_sid, result.build_sid);
    assert_eq!(deployments[0].environment_sid, result.environment_sid);

    let events = drain(&mut rx);
    assert_eq!(
        statuses(&events),
        vec![
            DeployStatus::CreatingService,
            DeployStatus::ConfiguringEnvironment,
            DeployStatus::CreatingFunctions,
            DeployStatus::UploadingFunctions,
            DeployStatus::CreatingAssets,
            DeployStatus::UploadingAssets,
            DeployStatus::Building,
            DeployStatus::Building,
            DeployStatus::SettingVariables,
            DeployStatus::ActivatingDeployment,
            DeployStatus::Done,
        ]
    );
    assert_eq!(
        events
            .iter()
            .filter(|e| e.message.ends_with("Current status: PENDING"))
            .count(),
        1
    );
    let done: Vec<_> = events.iter().filter(|e| e.status == DeployStatus::Done).collect();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].kind, EventKind::Status);
    assert!(
        events[..events.len() - 1]
            .iter()
            .all(|e| e.kind == EventKind::StatusUpdate)
    );
}

#[tokio::test(start_paused = true)]
async fn result_carries_route_paths_and_urls() {
    let api = Arc::new(MemoryApi::new());
    let client = DeployClient::new(api.clone());

    let mut project = sample_project();
    project.functions.push(
        FileInfo::from_content("admin/My Report.js", "x").with_visibility(Visibility::Protected),
    );

    let result = client.deploy_project(project).await.unwrap();

    assert_eq!(result.domain, "demo-dev.memory.local");
    let routes: Vec<_> = result
        .function_resources
        .iter()
        .map(|r| r.route_path.as_str())
        .collect();
    assert_eq!(routes, vec!["/example", "/admin/My-Report"]);
    assert_eq!(
        result.function_resources[1].url,
        "https://demo-dev.memory.local/admin/My-Report"
    );
    assert_eq!(result.function_resources[1].visibility, Visibility::Protected);
    assert_eq!(result.asset_resources[0].route_path, "/styles.css");

    let versions: Vec<_> = api
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            ApiCall::CreateVersion { path, .. } => Some(path),
            _ => None,
        })
        .collect();
    assert!(versions.contains(&"/admin/My-Report".to_string()));
}

#[tokio::test(start_paused = true)]
async fn redeploy_reuses_resources_but_uploads_and_builds_again() {
    let api = Arc::new(MemoryApi::new());
    let client = DeployClient::new(api.clone());
    let first = client.deploy_project(sample_project()).await.unwrap();
    api.clear_calls();

    let mut rx = client.subscribe();
    let second = client
        .deploy_project(DeployProjectConfig {
            service_sid: Some(first.service_sid.clone()),
            ..sample_project()
        })
        .await
        .unwrap();

    assert_eq!(api.count(is_create), 0);
    assert_eq!(api.count(|c| matches!(c, ApiCall::CreateService { .. })), 0);
    assert_eq!(api.count(is_upload), 2);
    assert_eq!(api.count(is_build), 1);

    assert_eq!(second.service_sid, first.service_sid);
    assert_eq!(second.environment_sid, first.environment_sid);
    assert_ne!(second.build_sid, first.build_sid);
    assert_eq!(
        second.function_resources[0].sid,
        first.function_resources[0].sid
    );

    let events = drain(&mut rx);
    assert!(!statuses(&events).contains(&DeployStatus::CreatingService));
    assert_eq!(api.deployments().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn resources_registered_elsewhere_are_reused() {
    let api = Arc::new(MemoryApi::new());
    let service = api.create_service("demo").await.unwrap();
    let function_sid = api.seed_resource(&service.sid, ResourceKind::Function, "example.js");
    let client = DeployClient::new(api.clone());

    let result = client
        .deploy_project(DeployProjectConfig {
            service_sid: Some(service.sid.clone()),
            ..sample_project()
        })
        .await
        .unwrap();

    assert_eq!(
        api.count(|c| matches!(c, ApiCall::CreateResource { kind: ResourceKind::Function, .. })),
        0
    );
    assert_eq!(
        api.count(|c| matches!(c, ApiCall::CreateResource { kind: ResourceKind::Asset, .. })),
        1
    );
    assert_eq!(result.function_resources[0].sid, function_sid);
}

#[tokio::test(start_paused = true)]
async fn service_is_looked_up_by_name_before_creating() {
    let api = Arc::new(MemoryApi::new());
    let client = DeployClient::new(api.clone());
    let first = client.deploy_project(sample_project()).await.unwrap();

    // No sid recorded locally: the existing service must be found again.
    let second = client.deploy_project(sample_project()).await.unwrap();

    assert_eq!(first.service_sid, second.service_sid);
    assert_eq!(api.services().len(), 1);
    assert_eq!(api.count(|c| matches!(c, ApiCall::CreateService { .. })), 1);
}

#[tokio::test(start_paused = true)]
async fn resource_creation_failure_stops_before_uploading() {
    let api = Arc::new(MemoryApi::new());
    api.fail_on(FailPoint::CreateResource("example.js".to_string()));
    let client = DeployClient::new(api.clone());
    let mut rx = client.subscribe();

    let err = client.deploy_project(sample_project()).await.unwrap_err();

    match &err {
        StratusError::ResourceCreation { kind, name, .. } => {
            assert_eq!(*kind, ResourceKind::Function);
            assert_eq!(name, "example.js");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(api.count(is_upload), 0);
    assert_eq!(api.count(is_build), 0);
    assert!(api.deployments().is_empty());

    let events = drain(&mut rx);
    assert!(!statuses(&events).contains(&DeployStatus::Done));
    assert_eq!(statuses(&events).last(), Some(&DeployStatus::CreatingFunctions));
}

#[tokio::test(start_paused = true)]
async fn version_failure_is_an_upload_error() {
    let api = Arc::new(MemoryApi::new());
    api.fail_on(FailPoint::CreateVersion("styles.css".to_string()));
    let client = DeployClient::new(api.clone());

    let err = client.deploy_project(sample_project()).await.unwrap_err();

    assert!(matches!(&err, StratusError::Upload { name, .. } if name == "styles.css"));
    assert_eq!(api.count(is_build), 0);
}

#[tokio::test(start_paused = true)]
async fn build_trigger_failure_is_not_swallowed() {
    let api = Arc::new(MemoryApi::new());
    api.fail_on(FailPoint::CreateBuild);
    let client = DeployClient::new(api.clone());

    let err = client.deploy_project(sample_project()).await.unwrap_err();

    assert!(matches!(err, StratusError::BuildTrigger(_)));
    assert_eq!(api.count(|c| matches!(c, ApiCall::GetBuild { .. })), 0);
    assert!(api.deployments().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_build_is_never_activated() {
    let api = Arc::new(
        MemoryApi::new().with_build_statuses(vec![BuildStatus::Building, BuildStatus::Failed]),
    );
    let client = DeployClient::new(api.clone());
    let mut rx = client.subscribe();

    let err = client.deploy_project(sample_project()).await.unwrap_err();

    assert!(matches!(err, StratusError::BuildFailed { .. }));
    assert!(api.deployments().is_empty());
    assert!(api.variables().is_empty());
    let events = drain(&mut rx);
    assert!(!statuses(&events).contains(&DeployStatus::TimedOut));
    assert!(!statuses(&events).contains(&DeployStatus::Done));
}

#[tokio::test(start_paused = true)]
async fn stuck_build_times_out_without_activation() {
    let api = Arc::new(MemoryApi::new().with_build_statuses(vec![BuildStatus::Pending]));
    let client = DeployClient::new(api.clone());
    let mut rx = client.subscribe();

    let err = client.deploy_project(sample_project()).await.unwrap_err();

    assert!(matches!(err, StratusError::BuildTimeout { .. }));
    assert!(api.deployments().is_empty());

    let events = drain(&mut rx);
    assert_eq!(statuses(&events).last(), Some(&DeployStatus::TimedOut));
}

#[tokio::test(start_paused = true)]
async fn dependencies_reach_the_build() {
    let api = Arc::new(MemoryApi::new());
    let client = DeployClient::new(api.clone());

    client
        .deploy_project(DeployProjectConfig {
            dependencies: vec![Dependency::new("lodash", "^4.17.21")],
            ..sample_project()
        })
        .await
        .unwrap();

    let manifest = api
        .calls()
        .into_iter()
        .find_map(|c| match c {
            ApiCall::CreateBuild { manifest } => Some(manifest),
            _ => None,
        })
        .unwrap();
    assert_eq!(manifest.dependencies, vec![Dependency::new("lodash", "^4.17.21")]);
}

#[tokio::test(start_paused = true)]
async fn existing_variables_are_overwritten() {
    let api = Arc::new(MemoryApi::new());
    let client = DeployClient::new(api.clone());
    let first = client.deploy_project(sample_project()).await.unwrap();

    client
        .deploy_project(DeployProjectConfig {
            service_sid: Some(first.service_sid),
            env: vars(&[("GREETING", "howdy"), ("EXTRA", "1")]),
            ..sample_project()
        })
        .await
        .unwrap();

    let mut variables: Vec<_> = api
        .variables()
        .into_iter()
        .map(|v| (v.key, v.value))
        .collect();
    variables.sort();
    assert_eq!(
        variables,
        vec![
            ("EXTRA".to_string(), "1".to_string()),
            ("GREETING".to_string(), "howdy".to_string())
        ]
    );
}

#[tokio::test]
async fn missing_service_name_is_rejected_before_any_call() {
    let api = Arc::new(MemoryApi::new());
    let client = DeployClient::new(api.clone());

    let err = client
        .deploy_project(DeployProjectConfig {
            service_name: String::new(),
            ..sample_project()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, StratusError::Configuration(_)));
    assert!(api.calls().is_empty());
}
