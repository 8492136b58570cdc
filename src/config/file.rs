//! Configuration file loading.

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::Path;

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns [`Error::ConfigRead`] if the file cannot be read, or
/// [`Error::ConfigParse`] if its contents are not valid TOML or are
/// missing a required table.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| Error::ConfigParse {
        path: path.to_path_buf(),
        source: Box::new(e),
    })
}

/// Load configuration from the default platform-specific path.
///
/// # Errors
///
/// Returns [`Error::ConfigDirNotFound`] if the platform config directory
/// cannot be determined, or any error [`load_config_file`] returns.
pub fn load_default_config() -> Result<Config> {
    load_config_file(&super::config_file_path()?)
}
