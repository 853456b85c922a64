//! Graph training loop.
//!
//! One page graph per forward pass, summed per-edge BCE loss, a validation pass
//! before training and after every epoch, and automatic best-model persistence.

mod accumulator;
mod checkpoint;
mod config;
mod data;
mod error;
mod loss;
mod trainer;


pub use accumulator::{RunningStats, WindowReport};
pub use checkpoint::{BestTracker, epoch_checkpoint_path, prepare_checkpoint_dir};
pub use config::{GraphTrainConfig, OptimizerKind};
pub use data::{GraphDataset, load_graph_data};
pub use error::TrainingError;
pub use loss::{bce_with_logits_sum, per_edge_accuracy, per_edge_loss};
pub use trainer::{
    GraphTrainer, StepOutcome, TrainingEvent, TrainingSummary, ValidationReport,
};
