//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable was set but could not be parsed.
    #[error("failed to parse {name}='{value}'")]
    InvalidValue { name: String, value: String },

    /// A value parsed fine but lies outside its allowed range.
    #[error("invalid {name} '{value}': expected {expected}")]
    OutOfRange {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    /// A setting without a default was not provided.
    #[error("missing required setting: {name}")]
    MissingValue { name: &'static str },

    /// Specified path does not exist on the filesystem.
    #[error("path does not exist: {path}")]
    PathNotFound { path: PathBuf },

    /// Path exists but is not a file (when a file was expected).
    #[error("path is not a file: {path}")]
    NotAFile { path: PathBuf },

    /// Path exists but is not a directory (when a directory was expected).
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}
