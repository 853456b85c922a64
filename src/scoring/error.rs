use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse clustering file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize clustering for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write clustering file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// No ground-truth page had a matching hypothesis, so there is nothing to average.
    #[error("no pages could be scored ({not_found} ground-truth pages had no hypothesis)")]
    EmptyCorpus { not_found: usize },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },
}
