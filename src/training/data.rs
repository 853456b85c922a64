use tracing::info;

use crate::config::{ConfigError, require_file};
use crate::graph::{GraphBundle, PageGraph};

use super::config::GraphTrainConfig;
use super::error::TrainingError;

/// Training and validation pages for one run.
#[derive(Debug, Clone, Default)]
pub struct GraphDataset {
    pub train: Vec<PageGraph>,
    pub val: Vec<PageGraph>,
}

/// Loads the pages named by `config`.
///
/// With an explicit validation bundle both bundles are used as-is; otherwise the
/// training bundle is split at `train_ratio`.
pub fn load_graph_data(config: &GraphTrainConfig) -> Result<GraphDataset, TrainingError> {
    let train_path = config
        .train_data
        .as_deref()
        .ok_or(ConfigError::MissingValue { name: "train_data" })?;
    require_file(train_path)?;

    let dataset = match config.val_data.as_deref() {
        Some(val_path) => {
            require_file(val_path)?;
            GraphDataset {
                train: GraphBundle::load(train_path)?.pages,
                val: GraphBundle::load(val_path)?.pages,
            }
        }
        None => {
            let bundle = GraphBundle::load(train_path)?;
            info!(nb_pages = bundle.len(), "There are {} graphs for training", bundle.len());
            let (train, val) = bundle.split(config.train_ratio);
            GraphDataset { train, val }
        }
    };

    info!(nb_pages = dataset.train.len(), "Train data has {} graphs", dataset.train.len());
    info!(nb_pages = dataset.val.len(), "Valid data has {} graphs", dataset.val.len());
    Ok(dataset)
}
