//! Resources returned by the platform's control plane.
//!
//! Field names follow the platform's snake_case JSON. Only the fields the
//! deploy pipeline and the list command use are modelled.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceResource {
    pub sid: String,
    pub unique_name: String,
    #[serde(default)]
    pub friendly_name: String,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentResource {
    pub sid: String,
    pub service_sid: String,
    pub unique_name: String,
    #[serde(default)]
    pub domain_suffix: Option<String>,
    pub domain_name: String,
    /// Build currently live on this environment, if any.
    #[serde(default)]
    pub build_sid: Option<String>,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_updated: Option<DateTime<Utc>>,
}

impl EnvironmentResource {
    /// Whether `key` names this environment by sid, suffix or unique name.
    pub fn matches(&self, key: &str) -> bool {
        self.sid == key
            || self.unique_name == key
            || self.domain_suffix.as_deref().unwrap_or_default() == key
    }
}

/// A registered function or asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteResource {
    pub sid: String,
    pub service_sid: String,
    pub friendly_name: String,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_updated: Option<DateTime<Utc>>,
}

/// Single-use storage target returned with every new version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    pub url: String,
    #[serde(rename = "kmsARN")]
    pub kms_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionResource {
    pub sid: String,
    pub path: String,
    #[serde(default)]
    pub visibility: Option<String>,
    pub pre_signed_upload_url: UploadTarget,
}

/// Build status as reported by the platform.
///
/// Unknown values are kept verbatim so they can be reported while polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuildStatus {
    Pending,
    Building,
    Verified,
    Failed,
    Other(String),
}

impl BuildStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Building => "BUILDING",
            Self::Verified => "VERIFIED",
            Self::Failed => "FAILED",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for BuildStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PENDING" => Self::Pending,
            "BUILDING" => Self::Building,
            "VERIFIED" => Self::Verified,
            "FAILED" => Self::Failed,
            _ => Self::Other(value),
        }
    }
}

impl From<BuildStatus> for String {
    fn from(status: BuildStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResource {
    pub sid: String,
    pub service_sid: String,
    pub status: BuildStatus,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResource {
    pub sid: String,
    pub service_sid: String,
    pub environment_sid: String,
    pub build_sid: String,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableResource {
    pub sid: String,
    pub service_sid: String,
    pub environment_sid: String,
    pub key: String,
    pub value: String,
}

/// Error body the platform sends with non-success responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub more_info: Option<String>,
}
