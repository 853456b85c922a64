use std::path::{Path, PathBuf};

use crate::config::{ConfigError, parse_env, parse_optional_path_from_env, require_dir};
use crate::constants::{
    DEFAULT_LM_BATCH_SIZE, DEFAULT_LM_EPOCHS, DEFAULT_LM_EVAL_EVERY, DEFAULT_LM_LR,
    DEFAULT_LM_MAX_SEQ_LEN, DEFAULT_MAX_GRAD_NORM, DEFAULT_SEED,
};

use super::error::FinetuneError;

/// File holding the validation pairs inside a data directory.
pub const VAL_FILENAME: &str = "val.jsonl";
/// Extension of pair files.
pub const PAIRS_EXTENSION: &str = "jsonl";

/// Settings of a pair-classifier fine-tuning run.
#[derive(Debug, Clone, PartialEq)]
pub struct FinetuneConfig {
    /// Directory scanned by [`discover_data_files`](Self::discover_data_files).
    pub data_dir: Option<PathBuf>,
    /// Training pair files.
    pub train_files: Vec<PathBuf>,
    /// Validation pair file.
    pub val_file: Option<PathBuf>,
    /// Directory with `config.json` and `model.safetensors` of the pretrained encoder.
    pub model_dir: Option<PathBuf>,
    /// `tokenizer.json`; defaults to the one inside `model_dir`.
    pub tokenizer_path: Option<PathBuf>,
    /// Directory receiving the best model.
    pub save_dir: Option<PathBuf>,
    pub epochs: usize,
    pub lr: f64,
    pub batch_size: usize,
    /// Training batches between two validation passes.
    pub eval_every: usize,
    pub max_seq_len: usize,
    pub max_grad_norm: f64,
    pub seed: u64,
}

impl Default for FinetuneConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            train_files: Vec::new(),
            val_file: None,
            model_dir: None,
            tokenizer_path: None,
            save_dir: None,
            epochs: DEFAULT_LM_EPOCHS,
            lr: DEFAULT_LM_LR,
            batch_size: DEFAULT_LM_BATCH_SIZE,
            eval_every: DEFAULT_LM_EVAL_EVERY,
            max_seq_len: DEFAULT_LM_MAX_SEQ_LEN,
            max_grad_norm: DEFAULT_MAX_GRAD_NORM,
            seed: DEFAULT_SEED,
        }
    }
}

impl FinetuneConfig {
    pub const ENV_DATA_DIR: &'static str = "TEXTBITE_LM_DATA";
    pub const ENV_MODEL_DIR: &'static str = "TEXTBITE_LM_MODEL";
    pub const ENV_TOKENIZER: &'static str = "TEXTBITE_LM_TOKENIZER";
    pub const ENV_SAVE_DIR: &'static str = "TEXTBITE_LM_SAVE";
    pub const ENV_EPOCHS: &'static str = "TEXTBITE_LM_EPOCHS";
    pub const ENV_LR: &'static str = "TEXTBITE_LM_LR";
    pub const ENV_BATCH_SIZE: &'static str = "TEXTBITE_LM_BATCH_SIZE";
    pub const ENV_EVAL_EVERY: &'static str = "TEXTBITE_LM_EVAL_EVERY";
    pub const ENV_MAX_SEQ_LEN: &'static str = "TEXTBITE_LM_MAX_SEQ_LEN";
    pub const ENV_MAX_GRAD_NORM: &'static str = "TEXTBITE_LM_MAX_GRAD_NORM";
    pub const ENV_SEED: &'static str = "TEXTBITE_SEED";

    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            data_dir: parse_optional_path_from_env(Self::ENV_DATA_DIR),
            model_dir: parse_optional_path_from_env(Self::ENV_MODEL_DIR),
            tokenizer_path: parse_optional_path_from_env(Self::ENV_TOKENIZER),
            save_dir: parse_optional_path_from_env(Self::ENV_SAVE_DIR),
            epochs: parse_env(Self::ENV_EPOCHS, defaults.epochs)?,
            lr: parse_env(Self::ENV_LR, defaults.lr)?,
            batch_size: parse_env(Self::ENV_BATCH_SIZE, defaults.batch_size)?,
            eval_every: parse_env(Self::ENV_EVAL_EVERY, defaults.eval_every)?,
            max_seq_len: parse_env(Self::ENV_MAX_SEQ_LEN, defaults.max_seq_len)?,
            max_grad_norm: parse_env(Self::ENV_MAX_GRAD_NORM, defaults.max_grad_norm)?,
            seed: parse_env(Self::ENV_SEED, defaults.seed)?,
            ..defaults
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("batch_size", self.batch_size),
            ("eval_every", self.eval_every),
            ("max_seq_len", self.max_seq_len),
        ] {
            if value == 0 {
                return Err(ConfigError::OutOfRange {
                    name,
                    value: value.to_string(),
                    expected: "a positive integer",
                });
            }
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "lr",
                value: self.lr.to_string(),
                expected: "a positive learning rate",
            });
        }
        if !(self.max_grad_norm.is_finite() && self.max_grad_norm > 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "max_grad_norm",
                value: self.max_grad_norm.to_string(),
                expected: "a positive norm",
            });
        }
        Ok(())
    }

    /// Fills `train_files` and `val_file` from `data_dir` when they are not set.
    ///
    /// Training files are the `train*.jsonl` files of the directory, sorted;
    /// validation data is `val.jsonl`.
    pub fn discover_data_files(&mut self) -> Result<(), FinetuneError> {
        if !self.train_files.is_empty() && self.val_file.is_some() {
            return Ok(());
        }
        let dir = self
            .data_dir
            .clone()
            .ok_or(ConfigError::MissingValue { name: "data_dir" })?;
        require_dir(&dir)?;

        if self.train_files.is_empty() {
            self.train_files = list_train_files(&dir)?;
        }
        if self.val_file.is_none() {
            self.val_file = Some(dir.join(VAL_FILENAME));
        }
        Ok(())
    }

    /// Tokenizer file to use: the explicit path, else `tokenizer.json` next to the model.
    pub fn resolved_tokenizer_path(&self) -> Result<PathBuf, ConfigError> {
        match (&self.tokenizer_path, &self.model_dir) {
            (Some(path), _) => Ok(path.clone()),
            (None, Some(model_dir)) => Ok(model_dir.join("tokenizer.json")),
            (None, None) => Err(ConfigError::MissingValue {
                name: "tokenizer_path",
            }),
        }
    }
}

fn list_train_files(dir: &Path) -> Result<Vec<PathBuf>, FinetuneError> {
    let entries = std::fs::read_dir(dir).map_err(|source| FinetuneError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| FinetuneError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        let is_train = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("train"));
        let is_pairs = path
            .extension()
            .is_some_and(|ext| ext == PAIRS_EXTENSION);
        if is_train && is_pairs && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
