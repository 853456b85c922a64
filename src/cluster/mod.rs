//! Cluster derivation.
//!
//! - [`build_clusters`] turns groupings (predicted or ground-truth bites) into a
//!   line → cluster id mapping.
//! - [`groupings_from_edges`] turns accepted affinity edges into groupings.

mod builder;
mod components;

#[cfg(test)]
mod tests;

pub use builder::{ClusterAssignment, build_clusters};
pub use components::groupings_from_edges;
