//! Edge affinity model.
//!
//! A stack of graph convolutions embeds every line of a page; the score of a
//! candidate edge is the dot product of its endpoint embeddings, so
//! `score(u, v) == score(v, u)` holds by construction.

mod affinity;
mod config;
mod device;
mod error;
mod gcn;
mod inference;
mod tensors;

#[cfg(test)]
mod tests;

pub use affinity::{EdgeAffinityModel, config_path_for};
pub use config::GraphModelConfig;
pub use device::{DevicePreference, select_device};
pub use error::ModelError;
pub use gcn::GcnLayer;
pub use inference::{accepted_edges, infer_page};
pub use tensors::{PageTensors, normalized_adjacency};
