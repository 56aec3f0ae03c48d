//! Terminal output for deployments, promotions and listings.

use anyhow::Result;
use console::style;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use stratus_core::deploy::{EnvVars, PromoteResult};
use stratus_core::list::ListResult;
use stratus_core::progress::{DeployStatus, EventKind, ProgressEvent};
use stratus_core::types::{DeployResult, DeployedResource};

use crate::OutputFormat;

/// Print progress events to stderr until the producer goes away.
pub fn spawn_progress(
    mut rx: broadcast::Receiver<ProgressEvent>,
    format: OutputFormat,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if matches!(format, OutputFormat::Table) {
                        eprintln!("{}", progress_line(&event));
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn progress_line(event: &ProgressEvent) -> String {
    match (event.kind, event.status) {
        (EventKind::Status, _) => format!("{} {}", style("✔").green().bold(), event.message),
        (_, DeployStatus::TimedOut) => format!("{} {}", style("✖").red().bold(), event.message),
        _ => format!("{} {}", style("›").cyan(), style(&event.message).dim()),
    }
}

pub fn print_deploy_result(result: &DeployResult, format: OutputFormat) -> Result<()> {
    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!();
    println!("{}", style("Deployment Details").bold());
    println!("  Domain:      {}", style(&result.domain).green());
    println!("  Service:     {}", result.service_sid);
    println!("  Environment: {}", result.environment_sid);
    println!("  Build:       {}", result.build_sid);

    print_resources("Functions", &result.function_resources);
    print_resources("Assets", &result.asset_resources);
    Ok(())
}

fn print_resources(title: &str, resources: &[DeployedResource]) {
    println!();
    println!("{}", style(title).bold());
    if resources.is_empty() {
        println!("  {}", style("(none)").dim());
        return;
    }
    for resource in resources {
        let visibility = format!("[{}]", resource.visibility);
        println!("  {:<12} {}", style(visibility).dim(), resource.url);
    }
}

pub fn print_promote_result(result: &PromoteResult, format: OutputFormat) -> Result<()> {
    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!(
        "Activated build {} on {}",
        style(&result.build_sid).bold(),
        style(format!("https://{}", result.domain)).green()
    );
    println!("  Deployment: {}", result.deployment_sid);
    Ok(())
}

pub fn print_variables(vars: &EnvVars, format: OutputFormat) -> Result<()> {
    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(vars)?);
        return Ok(());
    }

    if vars.is_empty() {
        println!("No variables set.");
        return Ok(());
    }
    for (key, value) in vars {
        println!("{}={}", style(key).bold(), value);
    }
    Ok(())
}

pub fn print_list(result: &ListResult, format: OutputFormat) -> Result<()> {
    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    if let Some(services) = &result.services {
        section("Services");
        for s in services {
            println!("  {:<34} {}", s.sid, s.unique_name);
        }
    }
    if let Some(environments) = &result.environments {
        section("Environments");
        for e in environments {
            println!(
                "  {:<34} {:<24} {}",
                e.sid,
                e.unique_name,
                style(&e.domain_name).green()
            );
        }
    }
    if let Some(functions) = &result.functions {
        section("Functions");
        for f in functions {
            println!("  {:<34} {}", f.sid, f.friendly_name);
        }
    }
    if let Some(assets) = &result.assets {
        section("Assets");
        for a in assets {
            println!("  {:<34} {}", a.sid, a.friendly_name);
        }
    }
    if let Some(builds) = &result.builds {
        section("Builds");
        for b in builds {
            let created = b
                .date_created
                .map(|d| d.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            println!("  {:<34} {:<10} {}", b.sid, b.status, created);
        }
    }
    if let Some(variables) = &result.variables {
        section("Variables");
        for v in variables {
            println!("  {}={}", style(&v.key).bold(), v.value);
        }
    }
    Ok(())
}

fn section(title: &str) {
    println!("{}", style(title).bold().cyan());
    println!("{}", "-".repeat(70));
}
