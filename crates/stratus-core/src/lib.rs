//! Stratus Core Library
//!
//! Deploys functions and static assets to a serverless hosting platform:
//! reconciles local files against remote resources, uploads their content,
//! builds, waits for the build and activates it on an environment.

pub mod api;
pub mod config;
pub mod context;
pub mod deploy;
pub mod error;
pub mod fs;
pub mod list;
pub mod progress;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Platform
    pub use crate::api::{ApiConfig, HttpApi, MemoryApi, ServerlessApi};

    // Deployment
    pub use crate::deploy::{
        BuildSource, DeployClient, DeployLocalProjectConfig, DeployProjectConfig, EnvVars,
        PollConfig, PromoteConfig, PromoteResult,
    };

    // Listing
    pub use crate::list::{ListConfig, ListResult, ListType, list_resources};

    // Progress
    pub use crate::progress::{DeployStatus, EventKind, ProgressEvent};

    // Configuration
    pub use crate::config::{Credentials, PackageJson, ProjectStore, StratusConfig};
    pub use crate::context::AppContext;
    pub use crate::fs::ListingOptions;

    // Types
    pub use crate::error::{StratusError, StratusResult};
    pub use crate::types::{
        Dependency, DeployResult, DeployedResource, FileInfo, ResourceKind, Visibility,
    };
}
