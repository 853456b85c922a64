use candle_core::{Result, Tensor};

use crate::constants::EDGE_PROBABILITY_THRESHOLD;

/// Summed binary cross-entropy between `sigmoid(logits)` and `targets`.
///
/// Computed on logits as `max(x, 0) - x·y + ln(1 + e^-|x|)`, which stays finite
/// for large logits. Returns a scalar tensor.
pub fn bce_with_logits_sum(logits: &Tensor, targets: &Tensor) -> Result<Tensor> {
    let positive_part = logits.relu()?;
    let agreement = (logits * targets)?;
    let softplus = logits.abs()?.neg()?.exp()?.affine(1.0, 1.0)?.log()?;
    ((positive_part - agreement)? + softplus)?.sum_all()
}

/// Page loss: BCE summed over every labeled edge.
pub fn per_edge_loss(scores: &Tensor, targets: &Tensor) -> Result<Tensor> {
    bce_with_logits_sum(scores, targets)
}

/// Fraction of edges whose thresholded prediction matches the label.
///
/// `None` for a page without edges.
pub fn per_edge_accuracy(scores: &[f32], labels: &[bool]) -> Option<f64> {
    if labels.is_empty() {
        return None;
    }
    debug_assert_eq!(scores.len(), labels.len());

    let hits = scores
        .iter()
        .zip(labels)
        .filter(|&(&score, &label)| (sigmoid(score) > EDGE_PROBABILITY_THRESHOLD) == label)
        .count();
    Some(hits as f64 / labels.len() as f64)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
