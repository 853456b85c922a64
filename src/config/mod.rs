//! Environment-backed configuration helpers.
//!
//! Component configs ([`GraphModelConfig`](crate::model::GraphModelConfig),
//! [`GraphTrainConfig`](crate::training::GraphTrainConfig),
//! [`FinetuneConfig`](crate::finetune::FinetuneConfig)) start from defaults,
//! read `TEXTBITE_*` overrides through these helpers, and are then overridden
//! again by explicit command-line flags.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Parses `var_name` when set, otherwise returns `default`.
pub fn parse_env<T: FromStr>(var_name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                name: var_name.to_string(),
                value,
            }),
        Err(_) => Ok(default),
    }
}

/// Reads a path from `var_name`; blank values count as unset.
pub fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
    env::var(var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Requires `path` to be an existing regular file.
pub fn require_file(path: &Path) -> Result<(), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::PathNotFound {
            path: path.to_path_buf(),
        });
    }
    if !path.is_file() {
        return Err(ConfigError::NotAFile {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Requires `path` to be an existing directory.
pub fn require_dir(path: &Path) -> Result<(), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::PathNotFound {
            path: path.to_path_buf(),
        });
    }
    if !path.is_dir() {
        return Err(ConfigError::NotADirectory {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Rejects an existing non-directory at a path that will be created as a directory.
pub fn require_dir_or_absent(path: &Path) -> Result<(), ConfigError> {
    if path.exists() && !path.is_dir() {
        return Err(ConfigError::NotADirectory {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}
