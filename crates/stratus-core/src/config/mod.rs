//! Project configuration.
//!
//! A deployment reads up to four sources from the project directory:
//! - `stratus.toml`: project settings and the service sid per account
//! - `.env`: credentials fallback and the variables to deploy
//! - `package.json`: fallback service name and build dependencies
//! - the user-level `stratus.toml` in the global config directory: defaults

pub mod credentials;
pub mod env;
pub mod package;
pub mod parser;
pub mod schema;
pub mod store;

pub use credentials::{Credentials, resolve_credentials};
pub use env::{deploy_variables, read_env_file};
pub use package::PackageJson;
pub use parser::{parse_stratus_toml, parse_stratus_toml_str, to_toml};
pub use schema::{ProjectSection, StratusConfig};
pub use store::{CONFIG_FILE_NAME, ProjectStore};
