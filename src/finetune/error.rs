use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum FinetuneError {
    #[error("tokenization failed: {reason}")]
    Tokenization { reason: String },

    #[error("malformed batch: {reason}")]
    BatchShape { reason: String },

    #[error("failed to load language model: {reason}")]
    ModelLoad { reason: String },

    #[error("tensor computation failed: {reason}")]
    Tensor { reason: String },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid example at {path}:{line}: {source}")]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("no {what} examples found")]
    EmptyDataset { what: &'static str },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<candle_core::Error> for FinetuneError {
    fn from(err: candle_core::Error) -> Self {
        FinetuneError::Tensor {
            reason: err.to_string(),
        }
    }
}
