use std::collections::HashMap;
use std::path::Path;

use candle_core::{DType, Device, IndexOp, Tensor, Var};
use candle_nn::{Linear, Module, VarBuilder, VarMap};
use candle_transformers::models::bert::{BertModel, Config};
use tracing::{debug, info, warn};

use super::batch::LmBatch;
use super::error::FinetuneError;

const ENCODER_PREFIX: &str = "bert";
const HEAD_PREFIX: &str = "classifier";

/// BERT encoder with a one-logit linear head on the `[CLS]` position.
///
/// All weights live in one trainable [`VarMap`], encoder under `bert.` and the
/// head under `classifier.`.
pub struct PairClassifier {
    bert: BertModel,
    head: Linear,
    varmap: VarMap,
    config: Config,
    device: Device,
}

impl std::fmt::Debug for PairClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairClassifier")
            .field("hidden_size", &self.config.hidden_size)
            .field("num_hidden_layers", &self.config.num_hidden_layers)
            .field("device", &format!("{:?}", self.device))
            .finish()
    }
}

impl PairClassifier {
    /// Freshly initialized classifier.
    pub fn new(config: Config, device: &Device) -> Result<Self, FinetuneError> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let bert = BertModel::load(vb.pp(ENCODER_PREFIX), &config)?;
        let head = candle_nn::linear(config.hidden_size, 1, vb.pp(HEAD_PREFIX))?;

        Ok(Self {
            bert,
            head,
            varmap,
            config,
            device: device.clone(),
        })
    }

    /// Builds a classifier whose encoder starts from the pretrained weights in
    /// `model_dir` (`config.json` + `model.safetensors`). The head starts fresh.
    pub fn load_pretrained(model_dir: &Path, device: &Device) -> Result<Self, FinetuneError> {
        let config = read_bert_config(model_dir)?;
        let weights_path = model_dir.join("model.safetensors");
        if !weights_path.is_file() {
            return Err(FinetuneError::ModelLoad {
                reason: format!("missing model.safetensors in {}", model_dir.display()),
            });
        }

        let mut model = Self::new(config, device)?;
        let pretrained = candle_core::safetensors::load(&weights_path, device)?;
        let (loaded, missing) = model.copy_encoder_weights(&pretrained)?;
        if missing > 0 {
            warn!(missing, "Encoder weights not found in checkpoint, keeping initialization");
        }

        info!(
            model_dir = %model_dir.display(),
            loaded,
            "Pretrained encoder loaded"
        );
        Ok(model)
    }

    /// Rebuilds a fine-tuned classifier saved with [`save`](Self::save).
    pub fn load_checkpoint(
        model_dir: &Path,
        weights: &Path,
        device: &Device,
    ) -> Result<Self, FinetuneError> {
        let config = read_bert_config(model_dir)?;
        let mut model = Self::new(config, device)?;
        model
            .varmap
            .load(weights)
            .map_err(|e| FinetuneError::ModelLoad {
                reason: format!("{}: {e}", weights.display()),
            })?;
        Ok(model)
    }

    pub fn save(&self, path: &Path) -> Result<(), FinetuneError> {
        self.varmap.save(path)?;
        debug!(path = %path.display(), "Pair classifier saved");
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn vars(&self) -> Vec<Var> {
        self.varmap.all_vars()
    }

    /// One logit per pair, `[batch]`.
    pub fn forward(&self, batch: &LmBatch) -> Result<Tensor, FinetuneError> {
        let hidden = self.bert.forward(
            &batch.input_ids,
            &batch.token_type_ids,
            Some(&batch.attention_mask),
        )?;
        let cls = hidden.i((.., 0, ..))?;
        Ok(self.head.forward(&cls)?.squeeze(1)?)
    }

    /// Copies matching tensors into the encoder; returns `(loaded, missing)`.
    ///
    /// Checkpoint names may carry a `bert.` or `roberta.` prefix or none at all.
    fn copy_encoder_weights(
        &mut self,
        pretrained: &HashMap<String, Tensor>,
    ) -> Result<(usize, usize), FinetuneError> {
        let source_prefix = ["bert.", "roberta."]
            .into_iter()
            .find(|prefix| pretrained.contains_key(&format!("{prefix}embeddings.word_embeddings.weight")))
            .unwrap_or("");

        let names: Vec<String> = {
            let data = self.varmap.data().lock().map_err(|e| FinetuneError::ModelLoad {
                reason: e.to_string(),
            })?;
            data.keys()
                .filter(|name| name.starts_with(ENCODER_PREFIX))
                .cloned()
                .collect()
        };

        let mut loaded = 0;
        let mut missing = 0;
        for name in names {
            let suffix = name
                .strip_prefix(ENCODER_PREFIX)
                .map(|s| s.trim_start_matches('.'))
                .unwrap_or(&name);
            match pretrained.get(&format!("{source_prefix}{suffix}")) {
                Some(tensor) => {
                    self.varmap
                        .set_one(&name, tensor.to_dtype(DType::F32)?)
                        .map_err(|e| FinetuneError::ModelLoad {
                            reason: format!("{name}: {e}"),
                        })?;
                    loaded += 1;
                }
                None => missing += 1,
            }
        }
        Ok((loaded, missing))
    }
}

fn read_bert_config(model_dir: &Path) -> Result<Config, FinetuneError> {
    let config_path = model_dir.join("config.json");
    let content = std::fs::read_to_string(&config_path).map_err(|source| FinetuneError::Io {
        path: config_path.clone(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| FinetuneError::ModelLoad {
        reason: format!("failed to parse {}: {e}", config_path.display()),
    })
}
