#![allow(dead_code)]

use std::path::Path;

use stratus_core::deploy::{DeployProjectConfig, EnvVars};
use stratus_core::progress::{DeployStatus, ProgressEvent};
use stratus_core::types::FileInfo;

pub const FUNCTION_SOURCE: &str = "exports.handler = (context, event, callback) => callback(null, 'hi');";
pub const STYLESHEET: &str = "body { color: teal; }";

pub fn vars(pairs: &[(&str, &str)]) -> EnvVars {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// One function, one asset, one variable.
pub fn sample_project() -> DeployProjectConfig {
    DeployProjectConfig {
        service_name: "demo".to_string(),
        environment: "dev".to_string(),
        functions: vec![FileInfo::from_content("example.js", FUNCTION_SOURCE)],
        assets: vec![FileInfo::from_content("styles.css", STYLESHEET)],
        env: vars(&[("GREETING", "hello")]),
        ..Default::default()
    }
}

pub fn statuses(events: &[ProgressEvent]) -> Vec<DeployStatus> {
    events.iter().map(|e| e.status).collect()
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}
