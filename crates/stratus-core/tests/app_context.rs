//! Project configuration through the application context.

mod support;

use stratus_core::config::{ProjectStore, StratusConfig, deploy_variables};
use stratus_core::context::AppContext;
use tempfile::TempDir;

use support::write_file;

const ACCOUNT: &str = "AC00000000000000000000000000000001";
const SERVICE: &str = "ZS00000000000000000000000000000001";

fn context() -> (TempDir, AppContext) {
    let tmp = TempDir::new().unwrap();
    let project = tmp.path().join("project");
    let global = tmp.path().join("global");
    std::fs::create_dir_all(&project).unwrap();
    let ctx = AppContext::with_global_config_dir(project, global);
    (tmp, ctx)
}

#[test]
fn missing_files_load_as_defaults() {
    let (_tmp, ctx) = context();

    assert_eq!(ctx.load_config().unwrap(), StratusConfig::default());
    assert!(ctx.read_env(None).unwrap().is_empty());
    assert!(ctx.package_json().unwrap().name.is_none());
}

#[test]
fn project_settings_override_user_defaults() {
    let (_tmp, ctx) = context();
    write_file(
        &ctx.global_config_dir().join("stratus.toml"),
        "[project]\nregion = \"au1\"\nedge = \"sydney\"\nenvironment = \"dev\"\n",
    );
    write_file(
        &ctx.project_root().join("stratus.toml"),
        "[project]\nservice_name = \"demo\"\nenvironment = \"stage\"\n",
    );

    let config = ctx.load_config().unwrap();
    assert_eq!(config.project.service_name.as_deref(), Some("demo"));
    assert_eq!(config.project.environment.as_deref(), Some("stage"));
    assert_eq!(config.project.region.as_deref(), Some("au1"));
    assert_eq!(config.project.edge.as_deref(), Some("sydney"));
}

#[test]
fn remembered_service_survives_reload_and_keeps_settings() {
    let (_tmp, ctx) = context();
    write_file(
        &ctx.project_root().join("stratus.toml"),
        "[project]\nservice_name = \"demo\"\n",
    );

    ctx.project_store().remember_service(ACCOUNT, SERVICE).unwrap();

    let reloaded = ProjectStore::in_dir(ctx.project_root()).load().unwrap();
    assert_eq!(reloaded.service_sid(ACCOUNT), Some(SERVICE));
    assert_eq!(reloaded.project.service_name.as_deref(), Some("demo"));
}

#[test]
fn env_file_path_can_be_overridden() {
    let (_tmp, ctx) = context();
    write_file(&ctx.project_root().join(".env.prod"), "MODE=prod\nAUTH_TOKEN=x\n");

    let local = ctx.read_env(Some(std::path::Path::new(".env.prod"))).unwrap();
    let deployed = deploy_variables(&local);
    assert_eq!(deployed.len(), 1);
    assert_eq!(deployed.get("MODE").map(String::as_str), Some("prod"));
}

#[test]
fn broken_project_file_names_the_line() {
    let (_tmp, ctx) = context();
    write_file(
        &ctx.project_root().join("stratus.toml"),
        "[project]\nservice_name = demo\n",
    );

    let err = ctx.load_config().unwrap_err().to_string();
    assert!(err.contains("stratus.toml"), "{err}");
    assert!(err.contains("line 2"), "{err}");
}
