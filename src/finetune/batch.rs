use std::io::{BufRead, BufReader};
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use serde::{Deserialize, Serialize};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use super::error::FinetuneError;

/// Two text segments and whether the second continues the same bite as the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairExample {
    pub first: String,
    pub second: String,
    pub label: bool,
}

/// Reads one JSON object per line; blank lines are skipped.
pub fn read_pairs(path: &Path) -> Result<Vec<PairExample>, FinetuneError> {
    let file = std::fs::File::open(path).map_err(|source| FinetuneError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut examples = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| FinetuneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let example = serde_json::from_str(&line).map_err(|source| FinetuneError::Json {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?;
        examples.push(example);
    }
    Ok(examples)
}

/// Reads and concatenates several pair files in order.
pub fn read_pair_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<PairExample>, FinetuneError> {
    let mut examples = Vec::new();
    for path in paths {
        examples.extend(read_pairs(path.as_ref())?);
    }
    Ok(examples)
}

/// A tokenized batch of pairs.
///
/// `input_ids`, `attention_mask` and `token_type_ids` are `[batch, seq]` u32
/// tensors; `labels` is a `[batch]` f32 tensor of 0/1 targets.
#[derive(Debug, Clone)]
pub struct LmBatch {
    pub input_ids: Tensor,
    pub attention_mask: Tensor,
    pub token_type_ids: Tensor,
    pub labels: Tensor,
}

impl LmBatch {
    /// Assembles a batch, checking dtypes and that all tensors agree on shape.
    pub fn new(
        input_ids: Tensor,
        attention_mask: Tensor,
        token_type_ids: Tensor,
        labels: Tensor,
    ) -> Result<Self, FinetuneError> {
        let (batch, seq) = input_ids.dims2().map_err(|e| FinetuneError::BatchShape {
            reason: format!("input_ids: {e}"),
        })?;

        for (name, tensor) in [
            ("attention_mask", &attention_mask),
            ("token_type_ids", &token_type_ids),
        ] {
            if tensor.dims() != [batch, seq] {
                return Err(FinetuneError::BatchShape {
                    reason: format!(
                        "{name} has shape {:?}, expected [{batch}, {seq}]",
                        tensor.dims()
                    ),
                });
            }
        }
        if labels.dims() != [batch] {
            return Err(FinetuneError::BatchShape {
                reason: format!("labels have shape {:?}, expected [{batch}]", labels.dims()),
            });
        }

        for (name, tensor, dtype) in [
            ("input_ids", &input_ids, DType::U32),
            ("attention_mask", &attention_mask, DType::U32),
            ("token_type_ids", &token_type_ids, DType::U32),
            ("labels", &labels, DType::F32),
        ] {
            if tensor.dtype() != dtype {
                return Err(FinetuneError::BatchShape {
                    reason: format!("{name} has dtype {:?}, expected {dtype:?}", tensor.dtype()),
                });
            }
        }

        Ok(Self {
            input_ids,
            attention_mask,
            token_type_ids,
            labels,
        })
    }

    /// Builds a batch from already tokenized rows, right-padding with id 0.
    ///
    /// Every token belongs to the first segment.
    pub fn from_token_ids(
        rows: &[Vec<u32>],
        labels: &[bool],
        device: &Device,
    ) -> Result<Self, FinetuneError> {
        if rows.len() != labels.len() {
            return Err(FinetuneError::BatchShape {
                reason: format!("{} rows but {} labels", rows.len(), labels.len()),
            });
        }
        let batch = rows.len();
        let seq = rows.iter().map(Vec::len).max().unwrap_or(0);

        let mut ids = Vec::with_capacity(batch * seq);
        let mut mask = Vec::with_capacity(batch * seq);
        for row in rows {
            ids.extend_from_slice(row);
            ids.extend(std::iter::repeat_n(0, seq - row.len()));
            mask.extend(std::iter::repeat_n(1u32, row.len()));
            mask.extend(std::iter::repeat_n(0u32, seq - row.len()));
        }

        Self::new(
            Tensor::from_vec(ids, (batch, seq), device)?,
            Tensor::from_vec(mask, (batch, seq), device)?,
            Tensor::zeros((batch, seq), DType::U32, device)?,
            labels_tensor(labels, device)?,
        )
    }

    pub fn len(&self) -> usize {
        self.input_ids.dims().first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn labels_tensor(labels: &[bool], device: &Device) -> Result<Tensor, FinetuneError> {
    let targets: Vec<f32> = labels
        .iter()
        .map(|&label| if label { 1.0 } else { 0.0 })
        .collect();
    Ok(Tensor::from_vec(targets, labels.len(), device)?)
}

/// Tokenizes pairs into [`LmBatch`]es.
///
/// Pairs are truncated to `max_seq_len` tokens and each batch is padded to its
/// longest member.
pub struct PairEncoder {
    tokenizer: Tokenizer,
    max_seq_len: usize,
}

impl std::fmt::Debug for PairEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairEncoder")
            .field("max_seq_len", &self.max_seq_len)
            .finish()
    }
}

impl PairEncoder {
    pub fn new(mut tokenizer: Tokenizer, max_seq_len: usize) -> Result<Self, FinetuneError> {
        let truncation = TruncationParams {
            max_length: max_seq_len,
            ..Default::default()
        };
        tokenizer
            .with_truncation(Some(truncation))
            .map_err(|e| FinetuneError::Tokenization {
                reason: format!("failed to configure truncation: {e}"),
            })?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        Ok(Self {
            tokenizer,
            max_seq_len,
        })
    }

    /// Loads `tokenizer.json`.
    pub fn from_file(path: &Path, max_seq_len: usize) -> Result<Self, FinetuneError> {
        let tokenizer = Tokenizer::from_file(path).map_err(|e| FinetuneError::Tokenization {
            reason: format!("failed to load tokenizer {}: {e}", path.display()),
        })?;
        Self::new(tokenizer, max_seq_len)
    }

    pub fn max_seq_len(&self) -> usize {
        self.max_seq_len
    }

    pub fn encode(&self, examples: &[PairExample], device: &Device) -> Result<LmBatch, FinetuneError> {
        if examples.is_empty() {
            return Err(FinetuneError::BatchShape {
                reason: "cannot encode an empty batch".to_string(),
            });
        }

        let inputs: Vec<(&str, &str)> = examples
            .iter()
            .map(|e| (e.first.as_str(), e.second.as_str()))
            .collect();
        let encodings = self
            .tokenizer
            .encode_batch(inputs, true)
            .map_err(|e| FinetuneError::Tokenization {
                reason: e.to_string(),
            })?;

        let batch = encodings.len();
        let seq = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);

        let mut ids = Vec::with_capacity(batch * seq);
        let mut mask = Vec::with_capacity(batch * seq);
        let mut type_ids = Vec::with_capacity(batch * seq);
        for encoding in &encodings {
            if encoding.get_ids().len() != seq {
                return Err(FinetuneError::BatchShape {
                    reason: "tokenizer returned rows of different lengths".to_string(),
                });
            }
            ids.extend_from_slice(encoding.get_ids());
            mask.extend_from_slice(encoding.get_attention_mask());
            type_ids.extend_from_slice(encoding.get_type_ids());
        }

        let labels: Vec<bool> = examples.iter().map(|e| e.label).collect();
        LmBatch::new(
            Tensor::from_vec(ids, (batch, seq), device)?,
            Tensor::from_vec(mask, (batch, seq), device)?,
            Tensor::from_vec(type_ids, (batch, seq), device)?,
            labels_tensor(&labels, device)?,
        )
    }
}
