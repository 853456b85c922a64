use std::collections::HashSet;
use std::fs;
use std::hash::Hash;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::cluster::build_clusters;

use super::error::ScoringError;
use super::format::read_page;
use super::measures::v_scores;
use super::types::{CorpusReport, PageScore, ScoreAccumulator, VScores, format_v_scores};

/// Scores a hypothesis clustering of one page against its ground truth.
///
/// The universe is every line mentioned on either side. A line missing from one
/// side gets the unclustered id there, so it stays in the universe as a mismatch.
pub fn score_page<T, G>(hypothesis: &[G], ground_truth: &[G]) -> VScores
where
    T: Eq + Hash + Clone,
    G: AsRef<[T]>,
{
    let mut seen: HashSet<&T> = HashSet::new();
    let universe: Vec<&T> = hypothesis
        .iter()
        .chain(ground_truth)
        .flat_map(|grouping| grouping.as_ref())
        .filter(|line| seen.insert(*line))
        .collect();

    let hyp_clusters = build_clusters(hypothesis);
    let gt_clusters = build_clusters(ground_truth);

    let hyp = hyp_clusters.labels_for(universe.iter().copied());
    let gt = gt_clusters.labels_for(universe.iter().copied());

    debug!(
        universe = universe.len(),
        hyp_bites = hypothesis.len(),
        gt_bites = ground_truth.len(),
        "Scoring page"
    );

    v_scores(&hyp, &gt)
}

/// Scores one hypothesis file against one ground-truth file.
pub fn score_page_files(hypothesis: &Path, ground_truth: &Path) -> Result<VScores, ScoringError> {
    let hyp = read_page(hypothesis)?;
    let gt = read_page(ground_truth)?;
    Ok(score_page(&hyp, &gt))
}

/// Scores every `*.json` page of `gt_dir` against the same-named file in `hyp_dir`.
pub fn score_corpus(hyp_dir: &Path, gt_dir: &Path) -> Result<CorpusReport, ScoringError> {
    score_corpus_with(hyp_dir, gt_dir, |_| {})
}

/// Like [`score_corpus`], calling `on_page` as soon as each page is scored.
///
/// Pages without a hypothesis are counted and excluded from the averages; a
/// warning with their fraction is logged at the end. Fails with
/// [`ScoringError::EmptyCorpus`] when no page could be scored.
pub fn score_corpus_with<F>(
    hyp_dir: &Path,
    gt_dir: &Path,
    mut on_page: F,
) -> Result<CorpusReport, ScoringError>
where
    F: FnMut(&PageScore),
{
    for dir in [hyp_dir, gt_dir] {
        if !dir.is_dir() {
            return Err(ScoringError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }
    }

    let mut accumulator = ScoreAccumulator::new();
    let mut pages = Vec::new();
    let mut not_found = Vec::new();

    for name in list_json_files(gt_dir)? {
        let hyp_path = hyp_dir.join(&name);
        if !hyp_path.is_file() {
            debug!(page = %name, "No hypothesis for ground-truth page");
            accumulator.add_not_found();
            not_found.push(name);
            continue;
        }

        let scores = score_page_files(&hyp_path, &gt_dir.join(&name))?;
        accumulator.add(&scores);

        info!(page = %name, scores = %format_v_scores(&scores), "Page scored");

        let page = PageScore { name, scores };
        on_page(&page);
        pages.push(page);
    }

    if accumulator.nb_not_found() > 0 {
        warn!(
            "Results partial, {} ({:.2} %) pages from ground truth were not matched",
            accumulator.nb_not_found(),
            100.0 * accumulator.not_found_fraction()
        );
    }

    let average = accumulator.average()?;

    Ok(CorpusReport {
        pages,
        not_found,
        average,
    })
}

fn list_json_files(dir: &Path) -> Result<Vec<String>, ScoringError> {
    let entries = fs::read_dir(dir).map_err(|source| ScoringError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ScoringError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".json") && entry.path().is_file() {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}
