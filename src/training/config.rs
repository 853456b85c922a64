use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::{ConfigError, parse_env, parse_optional_path_from_env};
use crate::constants::{
    DEFAULT_GRAD_ACCUMULATION, DEFAULT_GRAPH_EPOCHS, DEFAULT_GRAPH_LR, DEFAULT_REPORT_EVERY,
    DEFAULT_SEED, DEFAULT_TRAIN_RATIO,
};

/// Gradient descent flavour used by the graph trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizerKind {
    /// Adam (AdamW without weight decay).
    #[default]
    Adam,
    /// Plain stochastic gradient descent.
    Sgd,
}

impl FromStr for OptimizerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adam" => Ok(Self::Adam),
            "sgd" => Ok(Self::Sgd),
            _ => Err(ConfigError::OutOfRange {
                name: "optimizer",
                value: s.to_string(),
                expected: "adam or sgd",
            }),
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adam => write!(f, "adam"),
            Self::Sgd => write!(f, "sgd"),
        }
    }
}

/// Graph training run settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphTrainConfig {
    /// Bundle holding the training pages.
    pub train_data: Option<PathBuf>,
    /// Bundle holding the validation pages; when absent, `train_data` is split.
    pub val_data: Option<PathBuf>,
    /// Fraction of `train_data` used for training when splitting.
    pub train_ratio: f32,
    pub epochs: usize,
    pub lr: f64,
    pub optimizer: OptimizerKind,
    /// Pages whose losses are summed before one optimizer step.
    pub grad_accumulation: usize,
    /// Pages between two windowed training reports.
    pub report_every: usize,
    /// Where the best-by-validation-accuracy model is written.
    pub save_path: Option<PathBuf>,
    /// Directory receiving one checkpoint per epoch.
    pub checkpoint_dir: Option<PathBuf>,
    /// Seed of the per-epoch page shuffle.
    pub seed: u64,
}

impl Default for GraphTrainConfig {
    fn default() -> Self {
        Self {
            train_data: None,
            val_data: None,
            train_ratio: DEFAULT_TRAIN_RATIO,
            epochs: DEFAULT_GRAPH_EPOCHS,
            lr: DEFAULT_GRAPH_LR,
            optimizer: OptimizerKind::default(),
            grad_accumulation: DEFAULT_GRAD_ACCUMULATION,
            report_every: DEFAULT_REPORT_EVERY,
            save_path: None,
            checkpoint_dir: None,
            seed: DEFAULT_SEED,
        }
    }
}

impl GraphTrainConfig {
    pub const ENV_TRAIN_DATA: &'static str = "TEXTBITE_TRAIN_DATA";
    pub const ENV_VAL_DATA: &'static str = "TEXTBITE_VAL_DATA";
    pub const ENV_TRAIN_RATIO: &'static str = "TEXTBITE_TRAIN_RATIO";
    pub const ENV_EPOCHS: &'static str = "TEXTBITE_EPOCHS";
    pub const ENV_LR: &'static str = "TEXTBITE_LR";
    pub const ENV_OPTIMIZER: &'static str = "TEXTBITE_OPTIMIZER";
    pub const ENV_GRAD_ACCUMULATION: &'static str = "TEXTBITE_GRAD_ACCUMULATION";
    pub const ENV_REPORT_EVERY: &'static str = "TEXTBITE_REPORT_EVERY";
    pub const ENV_SAVE_PATH: &'static str = "TEXTBITE_SAVE_PATH";
    pub const ENV_CHECKPOINT_DIR: &'static str = "TEXTBITE_CHECKPOINT_DIR";
    pub const ENV_SEED: &'static str = "TEXTBITE_SEED";

    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            train_data: parse_optional_path_from_env(Self::ENV_TRAIN_DATA),
            val_data: parse_optional_path_from_env(Self::ENV_VAL_DATA),
            train_ratio: parse_env(Self::ENV_TRAIN_RATIO, defaults.train_ratio)?,
            epochs: parse_env(Self::ENV_EPOCHS, defaults.epochs)?,
            lr: parse_env(Self::ENV_LR, defaults.lr)?,
            optimizer: match std::env::var(Self::ENV_OPTIMIZER) {
                Ok(value) => value.parse()?,
                Err(_) => defaults.optimizer,
            },
            grad_accumulation: parse_env(Self::ENV_GRAD_ACCUMULATION, defaults.grad_accumulation)?,
            report_every: parse_env(Self::ENV_REPORT_EVERY, defaults.report_every)?,
            save_path: parse_optional_path_from_env(Self::ENV_SAVE_PATH),
            checkpoint_dir: parse_optional_path_from_env(Self::ENV_CHECKPOINT_DIR),
            seed: parse_env(Self::ENV_SEED, defaults.seed)?,
        })
    }

    /// Checks hyperparameters; paths are checked when data is loaded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.val_data.is_none() && !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return Err(ConfigError::OutOfRange {
                name: "train_ratio",
                value: self.train_ratio.to_string(),
                expected: "a fraction in (0, 1)",
            });
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "lr",
                value: self.lr.to_string(),
                expected: "a positive learning rate",
            });
        }
        for (name, value) in [
            ("grad_accumulation", self.grad_accumulation),
            ("report_every", self.report_every),
        ] {
            if value == 0 {
                return Err(ConfigError::OutOfRange {
                    name,
                    value: value.to_string(),
                    expected: "a positive integer",
                });
            }
        }
        Ok(())
    }
}
