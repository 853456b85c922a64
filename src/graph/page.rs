//! Page graph model.

use rkyv::{Archive, Deserialize, Serialize};

use super::error::GraphError;

/// One page: node features (one row per text line), candidate edges and,
/// during training, per-edge same-bite labels.
///
/// Stored as `rkyv` bytes inside a [`GraphBundle`](super::GraphBundle).
///
/// # Example
/// ```rust
/// use textbite::graph::PageGraph;
///
/// let page = PageGraph::new(
///     "page-1",
///     2,
///     vec![vec![0.0, 1.0], vec![1.0, 0.0]],
///     vec![(0, 1)],
///     vec![true],
/// )
/// .unwrap();
/// assert_eq!(page.nb_nodes(), 2);
/// assert_eq!(page.nb_edges(), 1);
/// ```
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PageGraph {
    /// Page name; hypothesis files produced from this page are named after it.
    pub name: String,
    /// Line identifier per node, or empty when the builder did not record them.
    pub line_ids: Vec<String>,
    /// Width of every node feature row.
    pub feature_width: u32,
    /// Row-major node feature matrix (`nb_nodes * feature_width` values).
    pub node_features: Vec<f32>,
    /// Edge source positions.
    pub edge_src: Vec<u32>,
    /// Edge destination positions, aligned with `edge_src`.
    pub edge_dst: Vec<u32>,
    /// Same-bite label per edge; empty for unlabeled (inference) pages.
    pub labels: Vec<bool>,
}

impl PageGraph {
    /// Builds a page from feature rows and `(source, destination)` edges and validates it.
    pub fn new(
        name: impl Into<String>,
        feature_width: usize,
        rows: Vec<Vec<f32>>,
        edges: Vec<(u32, u32)>,
        labels: Vec<bool>,
    ) -> Result<Self, GraphError> {
        let mut node_features = Vec::with_capacity(rows.len() * feature_width);
        for row in rows {
            if row.len() != feature_width {
                return Err(GraphError::FeatureWidthMismatch {
                    expected: feature_width,
                    actual: row.len(),
                });
            }
            node_features.extend(row);
        }

        let (edge_src, edge_dst) = edges.into_iter().unzip();

        let page = Self {
            name: name.into(),
            line_ids: Vec::new(),
            feature_width: feature_width as u32,
            node_features,
            edge_src,
            edge_dst,
            labels,
        };
        page.validate()?;
        Ok(page)
    }

    /// Attaches one line identifier per node.
    pub fn with_line_ids<I, S>(mut self, line_ids: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.line_ids = line_ids.into_iter().map(Into::into).collect();
        self.validate()?;
        Ok(self)
    }

    pub fn feature_width(&self) -> usize {
        self.feature_width as usize
    }

    pub fn nb_nodes(&self) -> usize {
        match self.feature_width() {
            0 => 0,
            width => self.node_features.len() / width,
        }
    }

    pub fn nb_edges(&self) -> usize {
        self.edge_src.len()
    }

    /// Returns `true` when every edge carries a label.
    pub fn is_labeled(&self) -> bool {
        !self.labels.is_empty() && self.labels.len() == self.nb_edges()
    }

    /// Edges as `(source, destination)` node positions.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edge_src
            .iter()
            .zip(&self.edge_dst)
            .map(|(&src, &dst)| (src as usize, dst as usize))
    }

    /// Line identifier of `node`, falling back to its position.
    pub fn line_id(&self, node: usize) -> String {
        self.line_ids
            .get(node)
            .cloned()
            .unwrap_or_else(|| node.to_string())
    }

    /// Checks the shape invariants the model and the trainer rely on.
    pub fn validate(&self) -> Result<(), GraphError> {
        let width = self.feature_width();
        if width == 0 || !self.node_features.len().is_multiple_of(width) {
            return Err(GraphError::FeatureShapeMismatch {
                len: self.node_features.len(),
                width,
            });
        }

        let nb_nodes = self.nb_nodes();
        if nb_nodes == 0 {
            return Err(GraphError::EmptyPage {
                page: self.name.clone(),
            });
        }

        if self.edge_src.len() != self.edge_dst.len() {
            return Err(GraphError::EdgeLengthMismatch {
                sources: self.edge_src.len(),
                destinations: self.edge_dst.len(),
            });
        }

        if !self.labels.is_empty() && self.labels.len() != self.nb_edges() {
            return Err(GraphError::LabelLengthMismatch {
                edges: self.nb_edges(),
                labels: self.labels.len(),
            });
        }

        if !self.line_ids.is_empty() && self.line_ids.len() != nb_nodes {
            return Err(GraphError::LineIdsMismatch {
                nodes: nb_nodes,
                line_ids: self.line_ids.len(),
            });
        }

        for (edge, (src, dst)) in self.edges().enumerate() {
            for node in [src, dst] {
                if node >= nb_nodes {
                    return Err(GraphError::NodeOutOfRange {
                        edge,
                        node,
                        nb_nodes,
                    });
                }
            }
        }

        Ok(())
    }

    /// Validates and additionally requires one label per edge.
    pub fn validate_labeled(&self) -> Result<(), GraphError> {
        self.validate()?;
        if self.labels.len() != self.nb_edges() {
            return Err(GraphError::LabelLengthMismatch {
                edges: self.nb_edges(),
                labels: self.labels.len(),
            });
        }
        Ok(())
    }
}
