use std::path::Path;

use candle_core::{DType, Device, Tensor, Var};
use candle_nn::{Dropout, Linear, Module, VarBuilder, VarMap};
use tracing::{debug, info};

use crate::graph::PageGraph;

use super::config::GraphModelConfig;
use super::error::ModelError;
use super::gcn::GcnLayer;
use super::tensors::PageTensors;

/// Learned node embeddings whose pairwise dot products score candidate edges.
///
/// The model owns its [`VarMap`]; the training loop is the only code that
/// mutates the weights.
pub struct EdgeAffinityModel {
    config: GraphModelConfig,
    varmap: VarMap,
    device: Device,
    layers: Vec<GcnLayer>,
    output: Linear,
    dropout: Dropout,
}

impl std::fmt::Debug for EdgeAffinityModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeAffinityModel")
            .field("config", &self.config)
            .field("device", &format!("{:?}", self.device))
            .field("nb_vars", &self.varmap.all_vars().len())
            .finish()
    }
}

impl EdgeAffinityModel {
    /// Creates a freshly initialized model on `device`.
    pub fn new(config: GraphModelConfig, device: &Device) -> Result<Self, ModelError> {
        config.validate()?;

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);

        let mut layers = Vec::with_capacity(config.nb_hidden);
        let mut in_dim = config.input_size;
        for i in 0..config.nb_hidden {
            layers.push(GcnLayer::new(
                in_dim,
                config.hidden_width,
                vb.pp(format!("gcn.{i}")),
            )?);
            in_dim = config.hidden_width;
        }
        let output = candle_nn::linear(config.hidden_width, config.output_size, vb.pp("output"))?;

        debug!(
            nb_hidden = config.nb_hidden,
            hidden_width = config.hidden_width,
            input_size = config.input_size,
            output_size = config.output_size,
            "Edge affinity model created"
        );

        Ok(Self {
            dropout: Dropout::new(config.dropout),
            config,
            varmap,
            device: device.clone(),
            layers,
            output,
        })
    }

    /// Rebuilds a model from `weights` and the config saved next to it.
    pub fn load(weights: &Path, device: &Device) -> Result<Self, ModelError> {
        if !weights.is_file() {
            return Err(ModelError::CheckpointNotFound {
                path: weights.to_path_buf(),
            });
        }

        let config = GraphModelConfig::load(&config_path_for(weights))?;
        let mut model = Self::new(config, device)?;
        model
            .varmap
            .load(weights)
            .map_err(|e| ModelError::Checkpoint {
                path: weights.to_path_buf(),
                reason: e.to_string(),
            })?;

        info!(path = %weights.display(), "Edge affinity model loaded");
        Ok(model)
    }

    /// Writes the weights (safetensors) and the config sidecar (JSON).
    pub fn save(&self, weights: &Path) -> Result<(), ModelError> {
        self.varmap
            .save(weights)
            .map_err(|e| ModelError::Checkpoint {
                path: weights.to_path_buf(),
                reason: e.to_string(),
            })?;
        self.config.save(&config_path_for(weights))?;

        debug!(path = %weights.display(), "Edge affinity model saved");
        Ok(())
    }

    pub fn config(&self) -> &GraphModelConfig {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Trainable variables, for the optimizer.
    pub fn vars(&self) -> Vec<Var> {
        self.varmap.all_vars()
    }

    /// Embeds every node from its features and its neighbours' features.
    ///
    /// `node_features` is `[nodes, input_size]`, `adjacency` is the `[nodes, nodes]`
    /// propagation matrix. Dropout is only active when `train` is set.
    pub fn embed(
        &self,
        node_features: &Tensor,
        adjacency: &Tensor,
        train: bool,
    ) -> Result<Tensor, ModelError> {
        let (_, width) = node_features.dims2()?;
        if width != self.config.input_size {
            return Err(ModelError::InvalidConfig {
                reason: format!(
                    "node features have width {width}, model expects {}",
                    self.config.input_size
                ),
            });
        }

        let mut xs = node_features.clone();
        for layer in &self.layers {
            xs = layer.forward(&xs, adjacency)?.relu()?;
            xs = self.dropout.forward(&xs, train)?;
        }
        Ok(self.output.forward(&xs)?)
    }

    /// Embeds the nodes of a page already moved to the device.
    pub fn embed_page(&self, page: &PageTensors, train: bool) -> Result<Tensor, ModelError> {
        self.embed(&page.node_features, &page.adjacency, train)
    }

    /// Per-edge logits: the dot product of the two endpoint embeddings.
    pub fn edge_scores(
        embeddings: &Tensor,
        edge_src: &Tensor,
        edge_dst: &Tensor,
    ) -> Result<Tensor, ModelError> {
        let lhs = embeddings.index_select(edge_src, 0)?;
        let rhs = embeddings.index_select(edge_dst, 0)?;
        Ok((lhs * rhs)?.sum(1)?)
    }

    /// Sigmoid of [`edge_scores`](Self::edge_scores), as host values.
    pub fn edge_probabilities(&self, page: &PageGraph) -> Result<Vec<f32>, ModelError> {
        if page.nb_edges() == 0 {
            page.validate()?;
            return Ok(Vec::new());
        }

        let tensors = PageTensors::new(page, &self.device)?;
        let embeddings = self.embed_page(&tensors, false)?;
        let scores = Self::edge_scores(&embeddings, &tensors.edge_src, &tensors.edge_dst)?;
        let probabilities = candle_nn::ops::sigmoid(&scores)?;
        Ok(probabilities.to_vec1::<f32>()?)
    }
}

/// `weights.safetensors` → `weights.json`.
pub fn config_path_for(weights: &Path) -> std::path::PathBuf {
    weights.with_extension("json")
}
