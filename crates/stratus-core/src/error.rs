//! Error types for stratus-core.

use std::path::PathBuf;
use std::time::Duration;

use crate::types::ResourceKind;

/// Result type alias using [`StratusError`].
pub type StratusResult<T> = Result<T, StratusError>;

/// Errors raised while talking to the platform or driving a deployment.
#[derive(Debug, thiserror::Error)]
pub enum StratusError {
    /// Missing or invalid configuration, detected before any remote call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// None of the candidate project directories exist.
    #[error("could not find any of these directories \"{}\"", .candidates.join("\", \""))]
    DirectoryNotFound {
        /// Directory names that were tried, in order.
        candidates: Vec<String>,
    },

    /// A function or asset could not be registered on the platform.
    #[error("failed to create {kind} \"{name}\"")]
    ResourceCreation {
        /// Function or asset.
        kind: ResourceKind,
        /// Local name of the offending file.
        name: String,
        /// Underlying failure.
        #[source]
        source: Box<StratusError>,
    },

    /// A version could not be created for a file.
    #[error("failed to upload \"{name}\"")]
    Upload {
        /// Local name of the offending file.
        name: String,
        /// Underlying failure.
        #[source]
        source: Box<StratusError>,
    },

    /// The build could not be submitted.
    #[error("failed to trigger build")]
    BuildTrigger(#[source] Box<StratusError>),

    /// The build did not verify before the deadline.
    #[error("build {build_sid} timed out after {}s", .timeout.as_secs())]
    BuildTimeout {
        /// Build being polled.
        build_sid: String,
        /// Deadline that elapsed.
        timeout: Duration,
    },

    /// The platform reported the build as failed.
    #[error("build {build_sid} failed")]
    BuildFailed {
        /// Build that failed.
        build_sid: String,
    },

    /// No environment matched the given sid or suffix.
    #[error("environment not found: {0}")]
    EnvironmentNotFound(String),

    /// No service matched the given sid or name.
    #[error("service not found: {0}")]
    ServiceNotFound(String),

    /// The platform answered with a non-success status.
    #[error("API error {status}{}: {message}", .code.map(|c| format!(" (code {c})")).unwrap_or_default())]
    Api {
        /// HTTP status code.
        status: u16,
        /// Platform error code, when the body carried one.
        code: Option<u32>,
        /// Human readable message.
        message: String,
        /// Link to the platform's documentation for this error.
        more_info: Option<String>,
    },

    /// Transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Filesystem error with the path that caused it.
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Serialisation error.
    #[error("serialisation error: {0}")]
    Serialisation(String),
}

impl StratusError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an I/O error bound to a path.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an API error without a platform code.
    #[must_use]
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: None,
            message: message.into(),
            more_info: None,
        }
    }

    /// HTTP status of an [`StratusError::Api`] error, looking through wrapped stage errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::ResourceCreation { source, .. } | Self::Upload { source, .. } => source.status(),
            Self::BuildTrigger(source) => source.status(),
            _ => None,
        }
    }

    /// Whether this is a platform "already exists" conflict.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }
}

impl From<serde_json::Error> for StratusError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialisation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_message_includes_code() {
        let err = StratusError::Api {
            status: 409,
            code: Some(54301),
            message: "Unique name already exists".to_string(),
            more_info: None,
        };
        assert_eq!(
            err.to_string(),
            "API error 409 (code 54301): Unique name already exists"
        );
        assert!(err.is_conflict());
    }

    #[test]
    fn wrapped_errors_expose_status() {
        let err = StratusError::ResourceCreation {
            kind: ResourceKind::Function,
            name: "example.js".to_string(),
            source: Box::new(StratusError::api(500, "boom")),
        };
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "failed to create function \"example.js\"");
    }

    #[test]
    fn timeout_and_failure_messages_differ() {
        let timeout = StratusError::BuildTimeout {
            build_sid: "ZB1".to_string(),
            timeout: Duration::from_secs(120),
        };
        let failed = StratusError::BuildFailed {
            build_sid: "ZB1".to_string(),
        };
        assert_eq!(timeout.to_string(), "build ZB1 timed out after 120s");
        assert_eq!(failed.to_string(), "build ZB1 failed");
    }

    #[test]
    fn directory_not_found_lists_candidates() {
        let err = StratusError::DirectoryNotFound {
            candidates: vec!["functions".to_string(), "src".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "could not find any of these directories \"functions\", \"src\""
        );
    }
}
