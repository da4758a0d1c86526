#[cfg(feature = "cli")]
pub mod cli;
pub mod evaluation_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command};
