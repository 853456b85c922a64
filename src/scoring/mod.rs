//! Clustering evaluation against ground truth.
//!
//! A page is scored by building cluster assignments for the hypothesis and the
//! ground truth with [`crate::cluster::build_clusters`] over the union of their
//! lines, then computing homogeneity, completeness and V-measure.
//!
//! # Missing lines and missing pages
//!
//! - A line present on only one side is labelled with
//!   [`UNCLUSTERED`](crate::constants::UNCLUSTERED) on the other side. It is kept
//!   in the universe, so the label vectors always have equal length.
//! - In corpus mode a ground-truth page without a hypothesis file is counted as
//!   "not found" and left out of the averages rather than scored as zero.
//!   Averaging over zero pages is an error ([`ScoringError::EmptyCorpus`]).

pub mod error;
pub mod format;
pub mod measures;
pub mod scorer;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::ScoringError;
pub use format::{Bite, parse_page, read_page, write_page};
pub use measures::homogeneity_completeness_v_measure;
pub use scorer::{score_corpus, score_corpus_with, score_page, score_page_files};
pub use types::{CorpusReport, PageScore, ScoreAccumulator, VScores, format_v_scores};
