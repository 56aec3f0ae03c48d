//! Shared domain types used across the deploy pipeline and the API layer.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::StratusResult;

/// The two kinds of file resources a service hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Function,
    Asset,
}

impl ResourceKind {
    /// Path segment used by the platform API (`Functions`, `Assets`).
    pub fn collection(self) -> &'static str {
        match self {
            Self::Function => "Functions",
            Self::Asset => "Assets",
        }
    }

    /// Key of the list in the platform's list responses.
    pub fn list_key(self) -> &'static str {
        match self {
            Self::Function => "functions",
            Self::Asset => "assets",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function => write!(f, "function"),
            Self::Asset => write!(f, "asset"),
        }
    }
}

/// Access level of a deployed version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the bytes of a file come from.
///
/// Exactly one source exists per file. Paths are only read at upload time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    Path(PathBuf),
    Content(Vec<u8>),
}

/// A local function or asset file before reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Logical name, matched against the remote friendly name.
    pub name: String,
    pub source: FileSource,
    pub visibility: Visibility,
}

impl FileInfo {
    /// File backed by a path on disk.
    pub fn from_path(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Path(path.into()),
            visibility: Visibility::default(),
        }
    }

    /// File backed by in-memory content.
    pub fn from_content(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Content(content.into()),
            visibility: Visibility::default(),
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

/// A file that has a remote identity on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResource {
    pub name: String,
    pub source: FileSource,
    /// URL path the file is served under, always starting with `/`.
    pub route_path: String,
    pub visibility: Visibility,
    /// Remote resource sid.
    pub sid: String,
}

/// A package dependency installed into the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: String,
}

impl Dependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Everything a single build is assembled from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildManifest {
    pub function_versions: Vec<String>,
    pub asset_versions: Vec<String>,
    pub dependencies: Vec<Dependency>,
}

impl BuildManifest {
    /// Form-encoded pairs for the build request.
    ///
    /// Empty lists are left out entirely: the platform treats a missing field
    /// differently from an empty one. Version sids are repeated keys, the
    /// dependency list is a single JSON value wrapped in double quotes.
    pub fn to_form(&self) -> StratusResult<Vec<(&'static str, String)>> {
        let mut form = Vec::new();

        if !self.dependencies.is_empty() {
            let json = serde_json::to_string(&self.dependencies)?;
            form.push(("Dependencies", format!("\"{}\"", json)));
        }
        for sid in &self.function_versions {
            form.push(("FunctionVersions", sid.clone()));
        }
        for sid in &self.asset_versions {
            form.push(("AssetVersions", sid.clone()));
        }

        Ok(form)
    }
}

/// A deployed file as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployedResource {
    pub name: String,
    pub route_path: String,
    pub visibility: Visibility,
    pub sid: String,
    pub url: String,
}

impl DeployedResource {
    pub fn new(resource: &FileResource, domain: &str) -> Self {
        Self {
            name: resource.name.clone(),
            route_path: resource.route_path.clone(),
            visibility: resource.visibility,
            sid: resource.sid.clone(),
            url: format!("https://{}{}", domain, resource.route_path),
        }
    }
}

/// Outcome of a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployResult {
    pub service_sid: String,
    pub environment_sid: String,
    pub build_sid: String,
    pub domain: String,
    pub function_resources: Vec<DeployedResource>,
    pub asset_resources: Vec<DeployedResource>,
}
