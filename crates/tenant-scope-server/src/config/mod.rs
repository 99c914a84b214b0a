//! Configuration management
//!
//! Supports configuration loading with precedence: env > file > CLI > defaults

mod builder;
mod env;
mod file;

use std::path::Path;

pub use builder::{Config, ConfigBuilder, HttpConfig, ObservabilityConfig};

use crate::Result;

/// Serializes tests that read or write process environment variables
#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Layer the discovered config file and then the environment over `base`.
///
/// `base` carries defaults and CLI arguments.
pub fn load_config(base: ConfigBuilder) -> Result<ConfigBuilder> {
    let mut builder = base;

    // Load from config file if exists
    if let Some(path) = file::find_config_file() {
        tracing::info!("Loading configuration from {}", path.display());
        builder = file::load_from_file(&path, builder)?;
    }

    // Override with environment variables
    env::load_from_env(builder)
}

/// Layer a specific file and then the environment over `base`
pub fn load_config_from_path(path: &Path, base: ConfigBuilder) -> Result<ConfigBuilder> {
    let builder = file::load_from_file(path, base)?;
    env::load_from_env(builder)
}
