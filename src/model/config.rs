use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DROPOUT, DEFAULT_HIDDEN_WIDTH, DEFAULT_INPUT_SIZE, DEFAULT_NB_HIDDEN,
    DEFAULT_OUTPUT_SIZE,
};

use crate::config::{ConfigError, parse_env};

use super::error::ModelError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Shape of an [`EdgeAffinityModel`](super::EdgeAffinityModel), fixed at construction.
///
/// Persisted next to the weights so a checkpoint can be rebuilt without flags.
pub struct GraphModelConfig {
    /// Node feature width.
    pub input_size: usize,
    /// Node embedding width.
    pub output_size: usize,
    /// Number of message-passing layers.
    pub nb_hidden: usize,
    /// Width of the message-passing layers.
    pub hidden_width: usize,
    /// Dropout probability after each message-passing layer (training only).
    pub dropout: f32,
}

impl Default for GraphModelConfig {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_INPUT_SIZE,
            output_size: DEFAULT_OUTPUT_SIZE,
            nb_hidden: DEFAULT_NB_HIDDEN,
            hidden_width: DEFAULT_HIDDEN_WIDTH,
            dropout: DEFAULT_DROPOUT,
        }
    }
}

impl GraphModelConfig {
    pub const ENV_INPUT_SIZE: &'static str = "TEXTBITE_INPUT_SIZE";
    pub const ENV_OUTPUT_SIZE: &'static str = "TEXTBITE_OUTPUT_SIZE";
    pub const ENV_NB_HIDDEN: &'static str = "TEXTBITE_NB_HIDDEN";
    pub const ENV_HIDDEN_WIDTH: &'static str = "TEXTBITE_HIDDEN_WIDTH";
    pub const ENV_DROPOUT: &'static str = "TEXTBITE_DROPOUT";

    /// Loads overrides from `TEXTBITE_*` variables on top of defaults.
    ///
    /// Unparsable values are rejected rather than ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            input_size: parse_env(Self::ENV_INPUT_SIZE, defaults.input_size)?,
            output_size: parse_env(Self::ENV_OUTPUT_SIZE, defaults.output_size)?,
            nb_hidden: parse_env(Self::ENV_NB_HIDDEN, defaults.nb_hidden)?,
            hidden_width: parse_env(Self::ENV_HIDDEN_WIDTH, defaults.hidden_width)?,
            dropout: parse_env(Self::ENV_DROPOUT, defaults.dropout)?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("input_size", self.input_size),
            ("output_size", self.output_size),
            ("hidden_width", self.hidden_width),
            ("nb_hidden", self.nb_hidden),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::OutOfRange {
                    name,
                    value: value.to_string(),
                    expected: "a positive integer",
                });
            }
        }

        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ConfigError::OutOfRange {
                name: "dropout",
                value: self.dropout.to_string(),
                expected: "a probability in [0, 1)",
            });
        }

        Ok(())
    }

    /// Reads the config saved next to a weights file.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path).map_err(|e| ModelError::Checkpoint {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| ModelError::Checkpoint {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| ModelError::Checkpoint {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| ModelError::Checkpoint {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
