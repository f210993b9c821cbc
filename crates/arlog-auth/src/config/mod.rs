//! Configuration management
//!
//! Supports configuration loading with precedence: env > file > CLI > defaults

mod builder;
mod env;
mod file;

pub use builder::{Config, ConfigBuilder, Environment, HttpConfig, TelemetryConfig};

use crate::Result;

/// Layer the config file and environment over `builder`.
///
/// `path` selects a file explicitly; otherwise the standard locations are searched.
pub fn load_config(builder: ConfigBuilder, path: Option<&std::path::Path>) -> Result<ConfigBuilder> {
    let mut builder = builder;

    let path = path.map(std::path::Path::to_path_buf).or_else(file::find_config_file);
    if let Some(path) = path {
        tracing::info!("Loading configuration from {}", path.display());
        builder = file::load_from_file(&path, builder)?;
    }

    env::load_from_env(builder)
}
