//! Filesystem helpers.

pub mod listing;

pub use listing::{ListingOptions, ProjectFiles, list_project_files};
