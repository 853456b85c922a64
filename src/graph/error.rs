use std::path::PathBuf;
use thiserror::Error;

/// Malformed page graphs and bundle I/O failures.
///
/// Shape errors are fatal for the page (and the run); nothing is skipped silently.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("edge {edge} references node {node}, but the page has {nb_nodes} nodes")]
    NodeOutOfRange {
        edge: usize,
        node: usize,
        nb_nodes: usize,
    },

    #[error("edge index has {sources} sources but {destinations} destinations")]
    EdgeLengthMismatch { sources: usize, destinations: usize },

    #[error("page has {edges} edges but {labels} labels")]
    LabelLengthMismatch { edges: usize, labels: usize },

    #[error("node feature buffer of {len} values is not a multiple of width {width}")]
    FeatureShapeMismatch { len: usize, width: usize },

    #[error("expected feature width {expected}, got {actual}")]
    FeatureWidthMismatch { expected: usize, actual: usize },

    #[error("page has {nodes} nodes but {line_ids} line ids")]
    LineIdsMismatch { nodes: usize, line_ids: usize },

    #[error("page '{page}' has no nodes")]
    EmptyPage { page: String },

    #[error("graph bundle at {path} contains no pages")]
    EmptyBundle { path: PathBuf },

    #[error("graph bundle I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("graph bundle is not a valid archive: {0}")]
    InvalidArchive(String),

    #[error("graph bundle data at offset 0 is not aligned to {alignment} bytes")]
    Misaligned { alignment: usize },
}
