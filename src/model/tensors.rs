use candle_core::{Device, Tensor};

use crate::graph::PageGraph;

use super::error::ModelError;

/// One page's tensors on a compute device.
///
/// Built right before a forward pass and dropped with the page, so no device
/// handles outlive the step that needed them.
#[derive(Debug, Clone)]
pub struct PageTensors {
    /// `[nodes, feature_width]` node features.
    pub node_features: Tensor,
    /// `[nodes, nodes]` dense normalized propagation matrix (see [`normalized_adjacency`]).
    pub adjacency: Tensor,
    /// `[edges]` source positions (u32).
    pub edge_src: Tensor,
    /// `[edges]` destination positions (u32).
    pub edge_dst: Tensor,
    /// `[edges]` same-bite targets as 0/1 (f32), when the page is labeled.
    pub labels: Option<Tensor>,
    nb_nodes: usize,
    nb_edges: usize,
}

impl PageTensors {
    /// Validates `page` and copies it onto `device`.
    pub fn new(page: &PageGraph, device: &Device) -> Result<Self, ModelError> {
        page.validate()?;

        let nb_nodes = page.nb_nodes();
        let nb_edges = page.nb_edges();

        let node_features = Tensor::from_slice(
            &page.node_features,
            (nb_nodes, page.feature_width()),
            device,
        )?;

        let adjacency = Tensor::from_vec(normalized_adjacency(page), (nb_nodes, nb_nodes), device)?;

        let edge_src = Tensor::from_slice(&page.edge_src, nb_edges, device)?;
        let edge_dst = Tensor::from_slice(&page.edge_dst, nb_edges, device)?;

        let labels = if page.is_labeled() {
            let targets: Vec<f32> = page
                .labels
                .iter()
                .map(|&same| if same { 1.0 } else { 0.0 })
                .collect();
            Some(Tensor::from_vec(targets, nb_edges, device)?)
        } else {
            None
        };

        Ok(Self {
            node_features,
            adjacency,
            edge_src,
            edge_dst,
            labels,
            nb_nodes,
            nb_edges,
        })
    }

    pub fn nb_nodes(&self) -> usize {
        self.nb_nodes
    }

    pub fn nb_edges(&self) -> usize {
        self.nb_edges
    }
}

/// Row-major `D^-1/2 (A + I) D^-1/2` with messages flowing source → destination.
///
/// The matrix is dense: a page of `n` lines costs `n * n` f32 values on the
/// device, so memory grows quadratically with the number of lines. Pages are a
/// few hundred lines at most; very large pages should be split upstream.
///
/// `A[dst][src]` counts the edges `src → dst` (explicit self-loops are dropped in
/// favour of the single added identity), and `D` is the in-degree plus one. Entries
/// are sums, so the result does not depend on the order edges are listed in.
pub fn normalized_adjacency(page: &PageGraph) -> Vec<f32> {
    let n = page.nb_nodes();

    let mut degree = vec![1.0f32; n];
    for (src, dst) in page.edges() {
        if src != dst {
            degree[dst] += 1.0;
        }
    }
    let inv_sqrt: Vec<f32> = degree.iter().map(|d| d.powf(-0.5)).collect();

    let mut adjacency = vec![0.0f32; n * n];
    for node in 0..n {
        adjacency[node * n + node] = inv_sqrt[node] * inv_sqrt[node];
    }
    for (src, dst) in page.edges() {
        if src != dst {
            adjacency[dst * n + src] += inv_sqrt[src] * inv_sqrt[dst];
        }
    }

    adjacency
}
