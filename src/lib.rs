//! Textbite library crate (used by the `textbite` binary and integration tests).
//!
//! Splits the text lines of a document page into *bites*: a graph model scores
//! candidate line-to-line edges, accepted edges are merged into clusters, and the
//! clusters are evaluated against ground truth with homogeneity, completeness and
//! V-measure.
//!
//! # Public API Surface
//!
//! ## Clustering
//! - [`build_clusters`], [`ClusterAssignment`] - line id → cluster id maps
//! - [`groupings_from_edges`] - connected components over accepted edges
//!
//! ## Evaluation
//! - [`score_page`], [`score_corpus`], [`VScores`], [`CorpusReport`]
//! - [`read_page`], [`write_page`] - per-page JSON clustering files
//!
//! ## Graphs & Model
//! - [`PageGraph`], [`GraphBundle`] - page graphs persisted as one `rkyv` bundle
//! - [`EdgeAffinityModel`], [`GraphModelConfig`] - node embeddings and dot-product edge scores
//! - [`infer_page`] - bites for an unlabeled page
//! - [`DevicePreference`], [`select_device`] - explicit compute device choice
//!
//! ## Training
//! - [`GraphTrainer`], [`GraphTrainConfig`] - per-page graph training loop
//! - [`PairTrainer`], [`PairClassifier`], [`FinetuneConfig`] - auxiliary LM fine-tuning

pub mod cluster;
pub mod config;
pub mod constants;
pub mod finetune;
pub mod graph;
pub mod model;
pub mod scoring;
pub mod training;

pub use cluster::{ClusterAssignment, build_clusters, groupings_from_edges};
pub use config::ConfigError;
pub use constants::{EDGE_PROBABILITY_THRESHOLD, UNCLUSTERED};
pub use finetune::{
    BinaryReport, FinetuneConfig, FinetuneError, LmBatch, PairClassifier, PairEncoder,
    PairExample, PairTrainer,
};
pub use graph::{GraphBundle, GraphError, PageGraph};
pub use model::{
    DevicePreference, EdgeAffinityModel, GraphModelConfig, ModelError, infer_page, select_device,
};
pub use scoring::{
    CorpusReport, PageScore, ScoringError, VScores, format_v_scores, read_page, score_corpus,
    score_page, write_page,
};
pub use training::{
    GraphTrainConfig, GraphTrainer, OptimizerKind, TrainingError, TrainingEvent, TrainingSummary,
};
