//! Entropy-based clustering measures.
//!
//! | Measure | Definition |
//! |---------|------------|
//! | homogeneity | `1 - H(truth | pred) / H(truth)` |
//! | completeness | `1 - H(pred | truth) / H(pred)` |
//! | V-measure | `2hc / (h + c)` |
//!
//! A labelling with a single class has zero entropy; the corresponding measure is
//! then defined as `1.0` instead of `0 / 0`.

use std::collections::HashMap;
use std::hash::Hash;

use super::error::ScoringError;
use super::types::VScores;

const ENTROPY_EPSILON: f64 = 1e-10;

/// Scores `pred` (hypothesis labels) against `truth` (reference labels).
///
/// Both slices label the same items in the same order. Empty input scores perfectly.
pub fn homogeneity_completeness_v_measure<L>(
    pred: &[L],
    truth: &[L],
) -> Result<VScores, ScoringError>
where
    L: Eq + Hash + Copy,
{
    if pred.len() != truth.len() {
        return Err(ScoringError::InvalidInput {
            reason: format!(
                "label vectors differ in length: {} predicted vs {} reference",
                pred.len(),
                truth.len()
            ),
        });
    }

    Ok(v_scores(pred, truth))
}

/// Same as [`homogeneity_completeness_v_measure`] for slices known to be aligned.
pub(crate) fn v_scores<L>(pred: &[L], truth: &[L]) -> VScores
where
    L: Eq + Hash + Copy,
{
    debug_assert_eq!(pred.len(), truth.len());

    if pred.is_empty() {
        return VScores::PERFECT;
    }

    let (h_truth, h_truth_given_pred) = conditional_entropies(truth, pred);
    let (h_pred, h_pred_given_truth) = conditional_entropies(pred, truth);

    let homogeneity = normalized_information(h_truth, h_truth_given_pred);
    let completeness = normalized_information(h_pred, h_pred_given_truth);

    VScores::from_parts(homogeneity, completeness)
}

fn normalized_information(entropy: f64, conditional: f64) -> f64 {
    if entropy < ENTROPY_EPSILON {
        return 1.0;
    }
    (1.0 - conditional / entropy).clamp(0.0, 1.0)
}

/// Returns `(H(A), H(A | B))` in nats.
fn conditional_entropies<L>(a: &[L], b: &[L]) -> (f64, f64)
where
    L: Eq + Hash + Copy,
{
    let n = a.len() as f64;

    let mut count_a: HashMap<L, usize> = HashMap::new();
    let mut count_b: HashMap<L, usize> = HashMap::new();
    let mut joint: HashMap<(L, L), usize> = HashMap::new();

    for (&va, &vb) in a.iter().zip(b) {
        *count_a.entry(va).or_insert(0) += 1;
        *count_b.entry(vb).or_insert(0) += 1;
        *joint.entry((va, vb)).or_insert(0) += 1;
    }

    let h_a: f64 = count_a
        .values()
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.ln()
        })
        .sum();

    // H(A|B) = -Σ_{a,b} P(a,b) ln(P(a,b) / P(b))
    let h_a_given_b: f64 = joint
        .iter()
        .map(|(&(_, vb), &n_ab)| {
            let n_b = count_b[&vb] as f64;
            let p_ab = n_ab as f64 / n;
            -p_ab * (n_ab as f64 / n_b).ln()
        })
        .sum();

    (h_a, h_a_given_b.max(0.0))
}
