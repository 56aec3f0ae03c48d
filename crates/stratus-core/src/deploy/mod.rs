//! Deployment pipeline.
//!
//! Each stage lives in its own module and works against a [`ServerlessApi`];
//! [`DeployClient`] sequences them and reports progress.
//!
//! [`ServerlessApi`]: crate::api::ServerlessApi

pub mod activate;
pub mod build;
pub mod client;
pub mod environment;
pub mod reconcile;
pub mod upload;
pub mod variables;

pub use build::{BuildPoller, PollConfig};
pub use client::{
    BuildSource, DeployClient, DeployLocalProjectConfig, DeployProjectConfig, PromoteConfig,
    PromoteResult,
};
pub use reconcile::{Reconciliation, reconcile, route_path};
pub use variables::EnvVars;
