//! Binary classification metrics.

use serde::Serialize;

/// Validation metrics for the match classifier.
///
/// Precision, recall, and F1 treat label 1 ("good match") as the positive
/// class and fall back to 0.0 when undefined (no predicted/actual
/// positives), matching the usual zero-division convention.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Metrics {
    pub accuracy: f32,
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
}

impl Metrics {
    /// Compute metrics from parallel prediction/label slices.
    pub fn compute(predictions: &[bool], labels: &[bool]) -> Self {
        debug_assert_eq!(predictions.len(), labels.len());

        let mut tp = 0usize;
        let mut tn = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        for (&pred, &label) in predictions.iter().zip(labels) {
            match (pred, label) {
                (true, true) => tp += 1,
                (false, false) => tn += 1,
                (true, false) => fp += 1,
                (false, true) => fn_ += 1,
            }
        }

        let total = predictions.len();
        let accuracy = if total > 0 {
            (tp + tn) as f32 / total as f32
        } else {
            0.0
        };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy,
            precision,
            recall,
            f1,
        }
    }
}

fn ratio(num: usize, den: usize) -> f32 {
    if den > 0 {
        num as f32 / den as f32
    } else {
        0.0
    }
}
