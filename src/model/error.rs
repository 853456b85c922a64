use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::graph::GraphError;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid model configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("{device} device unavailable: {reason}")]
    DeviceUnavailable { device: String, reason: String },

    #[error("tensor computation failed: {reason}")]
    Tensor { reason: String },

    #[error("model checkpoint not found at path: {path}")]
    CheckpointNotFound { path: PathBuf },

    #[error("failed to read or write checkpoint {path}: {reason}")]
    Checkpoint { path: PathBuf, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("malformed page graph: {0}")]
    Graph(#[from] GraphError),
}

impl From<candle_core::Error> for ModelError {
    fn from(err: candle_core::Error) -> Self {
        ModelError::Tensor {
            reason: err.to_string(),
        }
    }
}
