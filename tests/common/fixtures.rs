//! Test fixtures for integration tests.

use std::path::Path;

use textbite::{GraphModelConfig, PageGraph, write_page};

pub const FEATURE_WIDTH: usize = 4;

/// A small model config matching [`FEATURE_WIDTH`].
pub fn small_model_config() -> GraphModelConfig {
    GraphModelConfig {
        input_size: FEATURE_WIDTH,
        output_size: 4,
        nb_hidden: 1,
        hidden_width: 8,
        dropout: 0.0,
    }
}

/// Deterministic features for node `node` of page `seed`.
pub fn node_features(seed: usize, node: usize) -> Vec<f32> {
    (0..FEATURE_WIDTH)
        .map(|k| (((seed * 7 + node * 3 + k * 5) % 11) as f32) / 11.0 - 0.4)
        .collect()
}

/// A labeled chain page: nodes `0..nb_nodes` linked in reading order, with
/// edges inside the first half labeled positive.
pub fn chain_page(name: &str, seed: usize, nb_nodes: usize) -> PageGraph {
    let rows = (0..nb_nodes).map(|node| node_features(seed, node)).collect();
    let edges: Vec<(u32, u32)> = (1..nb_nodes as u32).map(|dst| (dst - 1, dst)).collect();
    let labels = edges
        .iter()
        .map(|&(_, dst)| (dst as usize) < nb_nodes / 2)
        .collect();

    PageGraph::new(name, FEATURE_WIDTH, rows, edges, labels)
        .and_then(|page| page.with_line_ids((0..nb_nodes).map(|node| format!("{name}-l{node}"))))
        .expect("fixture page should be valid")
}

pub fn chain_pages(count: usize, nb_nodes: usize) -> Vec<PageGraph> {
    (0..count)
        .map(|seed| chain_page(&format!("page-{seed}"), seed, nb_nodes))
        .collect()
}

pub fn bites(groups: &[&[&str]]) -> Vec<Vec<String>> {
    groups
        .iter()
        .map(|group| group.iter().map(|line| line.to_string()).collect())
        .collect()
}

pub fn write_bites(dir: &Path, file_name: &str, groups: &[&[&str]]) {
    write_page(&dir.join(file_name), &bites(groups)).expect("fixture page should be written");
}
