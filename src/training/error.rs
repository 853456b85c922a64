use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::graph::GraphError;
use crate::model::ModelError;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("no trainable pages: every training page is empty or has no edges")]
    EmptyTrainingSet,

    #[error("no validation pages: every validation page is empty or has no edges")]
    EmptyValidationSet,

    #[error("page '{page}' has {edges} edges but {labels} labels")]
    UnlabeledPage {
        page: String,
        edges: usize,
        labels: usize,
    },

    #[error("failed to create checkpoint directory {path}: {source}")]
    CheckpointDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tensor computation failed: {reason}")]
    Tensor { reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl From<candle_core::Error> for TrainingError {
    fn from(err: candle_core::Error) -> Self {
        TrainingError::Tensor {
            reason: err.to_string(),
        }
    }
}
