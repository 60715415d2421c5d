//! Layered configuration: built-in defaults, an optional TOML file, `-S key=value`
//! overrides and finally explicit command-line flags.

pub mod builder;
pub mod defaults;
pub mod file;
pub mod models;

pub use builder::{build_launch_config, build_prepare_config};
pub use models::LaunchConfig;
