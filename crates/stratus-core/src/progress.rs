//! Deployment progress events.
//!
//! The deploy client is the single producer. Any number of subscribers can
//! observe the stream; emitting never blocks, and events sent while nobody is
//! subscribed are dropped.

use std::fmt;

use serde::Serialize;
use tokio::sync::broadcast;

/// Capacity of the progress channel. Slow subscribers lose the oldest events.
const CHANNEL_CAPACITY: usize = 64;

/// Stage of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeployStatus {
    CreatingService,
    ConfiguringEnvironment,
    CreatingFunctions,
    UploadingFunctions,
    CreatingAssets,
    UploadingAssets,
    Building,
    TimedOut,
    SettingVariables,
    ActivatingDeployment,
    Done,
    ReadingFilesystem,
}

impl DeployStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatingService => "CREATING_SERVICE",
            Self::ConfiguringEnvironment => "CONFIGURING_ENVIRONMENT",
            Self::CreatingFunctions => "CREATING_FUNCTIONS",
            Self::UploadingFunctions => "UPLOADING_FUNCTIONS",
            Self::CreatingAssets => "CREATING_ASSETS",
            Self::UploadingAssets => "UPLOADING_ASSETS",
            Self::Building => "BUILDING",
            Self::TimedOut => "TIMED_OUT",
            Self::SettingVariables => "SETTING_VARIABLES",
            Self::ActivatingDeployment => "ACTIVATING_DEPLOYMENT",
            Self::Done => "DONE",
            Self::ReadingFilesystem => "READING_FILESYSTEM",
        }
    }
}

impl fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `StatusUpdate` marks an intermediate stage, `Status` the terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    StatusUpdate,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub kind: EventKind,
    pub status: DeployStatus,
    pub message: String,
}

/// Producer side of the progress stream.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: broadcast::Sender<ProgressEvent>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    pub fn update(&self, status: DeployStatus, message: impl Into<String>) {
        self.emit(EventKind::StatusUpdate, status, message.into());
    }

    pub fn finish(&self, status: DeployStatus, message: impl Into<String>) {
        self.emit(EventKind::Status, status, message.into());
    }

    fn emit(&self, kind: EventKind, status: DeployStatus, message: String) {
        tracing::debug!(status = %status, %message, "progress");
        // Err only means there are no subscribers.
        let _ = self.tx.send(ProgressEvent {
            kind,
            status,
            message,
        });
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain every event currently buffered in a receiver.
pub fn drain(rx: &mut broadcast::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    events
}
