//! Submit builds and wait for them to settle.

use std::time::Duration;

use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, warn};

use crate::api::{BuildResource, BuildStatus, ServerlessApi};
use crate::error::{StratusError, StratusResult};
use crate::progress::{DeployStatus, ProgressReporter};
use crate::types::BuildManifest;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_millis(120_000);

/// Submit a build of the given versions and dependencies.
pub async fn trigger(
    api: &dyn ServerlessApi,
    service_sid: &str,
    manifest: &BuildManifest,
) -> StratusResult<BuildResource> {
    debug!(
        functions = manifest.function_versions.len(),
        assets = manifest.asset_versions.len(),
        dependencies = manifest.dependencies.len(),
        "triggering build"
    );
    api.create_build(service_sid, manifest)
        .await
        .map_err(|e| StratusError::BuildTrigger(Box::new(e)))
}

/// How often and for how long to poll a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_BUILD_TIMEOUT,
        }
    }
}

/// Polls a build until it is verified, fails, or the deadline passes.
pub struct BuildPoller<'a> {
    api: &'a dyn ServerlessApi,
    reporter: &'a ProgressReporter,
    config: PollConfig,
}

impl<'a> BuildPoller<'a> {
    pub fn new(
        api: &'a dyn ServerlessApi,
        reporter: &'a ProgressReporter,
        config: PollConfig,
    ) -> Self {
        Self {
            api,
            reporter,
            config,
        }
    }

    /// Wait for `build_sid` to reach `VERIFIED`.
    ///
    /// Every poll that sees a non-terminal status reports it as `BUILDING`.
    /// `FAILED` ends the wait immediately. When the deadline passes, `TIMED_OUT`
    /// is emitted and no further poll is made. A status read still in flight at
    /// the deadline is abandoned.
    pub async fn wait(&self, service_sid: &str, build_sid: &str) -> StratusResult<BuildResource> {
        let deadline = Instant::now() + self.config.timeout;

        loop {
            sleep(self.config.interval).await;

            if Instant::now() >= deadline {
                return Err(self.timed_out(build_sid));
            }

            let read = timeout_at(deadline, self.api.get_build(service_sid, build_sid)).await;
            let Ok(build) = read else {
                return Err(self.timed_out(build_sid));
            };
            let build = build?;
            match &build.status {
                BuildStatus::Verified => return Ok(build),
                BuildStatus::Failed => {
                    return Err(StratusError::BuildFailed {
                        build_sid: build_sid.to_string(),
                    });
                }
                status => self.reporter.update(
                    DeployStatus::Building,
                    format!("Waiting for deployment. Current status: {}", status),
                ),
            }
        }
    }

    fn timed_out(&self, build_sid: &str) -> StratusError {
        warn!(build = %build_sid, "build did not verify before the deadline");
        self.reporter
            .update(DeployStatus::TimedOut, "Deployment took too long");
        StratusError::BuildTimeout {
            build_sid: build_sid.to_string(),
            timeout: self.config.timeout,
        }
    }
}
