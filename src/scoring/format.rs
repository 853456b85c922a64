//! Clustering files: one JSON array per page.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ScoringError;

/// One bite as written by the inference pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bite {
    pub lines: Vec<String>,
}

/// Either `{"lines": [...], ...}` or a bare `[...]` of line ids.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum BiteRecord {
    Bite(Bite),
    Lines(Vec<String>),
}

impl BiteRecord {
    fn into_lines(self) -> Vec<String> {
        match self {
            BiteRecord::Bite(bite) => bite.lines,
            BiteRecord::Lines(lines) => lines,
        }
    }
}

/// Parses a page of bites from JSON text.
pub fn parse_page(json: &str) -> Result<Vec<Vec<String>>, serde_json::Error> {
    let records: Vec<BiteRecord> = serde_json::from_str(json)?;
    Ok(records.into_iter().map(BiteRecord::into_lines).collect())
}

/// Reads one page file into its groupings.
pub fn read_page(path: &Path) -> Result<Vec<Vec<String>>, ScoringError> {
    let content = fs::read_to_string(path).map_err(|source| ScoringError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_page(&content).map_err(|source| ScoringError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes groupings as an array of `{"lines": [...]}` objects.
pub fn write_page(path: &Path, groupings: &[Vec<String>]) -> Result<(), ScoringError> {
    let bites: Vec<Bite> = groupings
        .iter()
        .map(|lines| Bite {
            lines: lines.clone(),
        })
        .collect();

    let json = serde_json::to_string_pretty(&bites).map_err(|source| ScoringError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    fs::write(path, json).map_err(|source| ScoringError::Write {
        path: path.to_path_buf(),
        source,
    })
}
