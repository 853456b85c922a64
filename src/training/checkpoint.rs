use std::path::{Path, PathBuf};

use tracing::info;

use crate::constants::WEIGHTS_EXTENSION;
use crate::model::EdgeAffinityModel;

use super::error::TrainingError;

/// Remembers the best validation metric seen so far.
#[derive(Debug, Clone, Default)]
pub struct BestTracker {
    best: Option<f64>,
}

impl BestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn best(&self) -> Option<f64> {
        self.best
    }

    /// Records `metric` and returns `true` when it strictly beats the best so far.
    ///
    /// The first finite value always counts as an improvement; NaN never does.
    pub fn update(&mut self, metric: f64) -> bool {
        if metric.is_nan() {
            return false;
        }
        match self.best {
            Some(best) if metric <= best => false,
            _ => {
                self.best = Some(metric);
                true
            }
        }
    }
}

/// `<dir>/checkpoint.<epoch>.safetensors`
pub fn epoch_checkpoint_path(dir: &Path, epoch: usize) -> PathBuf {
    dir.join(format!("checkpoint.{epoch}.{WEIGHTS_EXTENSION}"))
}

/// Creates the checkpoint directory up front so a bad path fails before training.
pub fn prepare_checkpoint_dir(dir: &Path) -> Result<(), TrainingError> {
    std::fs::create_dir_all(dir).map_err(|source| TrainingError::CheckpointDir {
        path: dir.to_path_buf(),
        source,
    })
}

pub(crate) fn save_best(
    model: &EdgeAffinityModel,
    path: &Path,
    accuracy: f64,
) -> Result<(), TrainingError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        prepare_checkpoint_dir(parent)?;
    }
    model.save(path)?;
    info!(path = %path.display(), accuracy, "Saved best model");
    Ok(())
}
