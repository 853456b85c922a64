//! Cross-cutting, shared constants.
//!
//! Hyperparameter defaults live here so the config layer, the binary and the
//! tests agree on them without re-stating literals.

/// Cluster id used for a line that no grouping mentions.
pub const UNCLUSTERED: i64 = -1;

/// Probability above which an edge is accepted as "same bite".
pub const EDGE_PROBABILITY_THRESHOLD: f32 = 0.5;

/// Width of the node feature vectors produced by the graph builder.
pub const DEFAULT_INPUT_SIZE: usize = 97;
/// Width of the per-node embedding the affinity model outputs.
pub const DEFAULT_OUTPUT_SIZE: usize = 10;
pub const DEFAULT_NB_HIDDEN: usize = 2;
pub const DEFAULT_HIDDEN_WIDTH: usize = 256;
pub const DEFAULT_DROPOUT: f32 = 0.1;

pub const DEFAULT_GRAPH_EPOCHS: usize = 50;
pub const DEFAULT_GRAPH_LR: f64 = 1e-3;
pub const DEFAULT_TRAIN_RATIO: f32 = 0.8;
pub const DEFAULT_GRAD_ACCUMULATION: usize = 1;
/// Pages processed between two windowed training reports.
pub const DEFAULT_REPORT_EVERY: usize = 25;

pub const DEFAULT_LM_EPOCHS: usize = 1;
pub const DEFAULT_LM_LR: f64 = 1e-3;
pub const DEFAULT_LM_BATCH_SIZE: usize = 16;
/// Training batches between two validation passes during LM fine-tuning.
pub const DEFAULT_LM_EVAL_EVERY: usize = 100;
pub const DEFAULT_LM_MAX_SEQ_LEN: usize = 512;
pub const DEFAULT_MAX_GRAD_NORM: f64 = 1.0;

pub const DEFAULT_SEED: u64 = 42;

/// File name of the best fine-tuned pair classifier inside the save directory.
pub const BEST_PAIR_MODEL_FILENAME: &str = "best-pair-classifier.safetensors";

/// Default extension of weight files written by the trainers.
pub const WEIGHTS_EXTENSION: &str = "safetensors";
