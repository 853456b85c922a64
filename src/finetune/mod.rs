//! Auxiliary fine-tuning of a BERT-style encoder on text-segment pairs.
//!
//! The classifier predicts whether a second segment continues the bite of the
//! first one. Data is read from JSON-lines files of [`PairExample`]s and
//! tokenized into strongly typed [`LmBatch`]es.

mod batch;
mod classifier;
mod config;
mod error;
mod metrics;
mod trainer;


pub use batch::{LmBatch, PairEncoder, PairExample, read_pair_files, read_pairs};
pub use classifier::PairClassifier;
pub use config::{FinetuneConfig, PAIRS_EXTENSION, VAL_FILENAME};
pub use error::FinetuneError;
pub use metrics::BinaryReport;
pub use trainer::{
    FinetuneEvent, FinetuneSummary, PairEvaluation, PairTrainer, clip_grad_norm,
};
