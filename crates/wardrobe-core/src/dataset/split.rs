//! Stratified train/validation splitting and class weighting.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::DatasetError;

/// Row indices for a stratified train/validation split.
#[derive(Debug, Clone)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Split rows into train and validation sets, preserving the label ratio.
///
/// Each class is shuffled with the seeded RNG and contributes
/// `round(n_class * validation_split)` rows (at least 1, at most
/// `n_class - 1`) to the validation set. Requires both labels present.
pub fn stratified_split(
    labels: &Array1<f32>,
    validation_split: f64,
    seed: u64,
) -> Result<SplitIndices, DatasetError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut validation = Vec::new();

    for class in [0.0_f32, 1.0] {
        let mut indices: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &y)| y == class)
            .map(|(i, _)| i)
            .collect();
        if indices.len() < 2 {
            return Err(DatasetError::SingleClass);
        }

        indices.shuffle(&mut rng);
        let val_count = ((indices.len() as f64) * validation_split).round() as usize;
        let val_count = val_count.clamp(1, indices.len() - 1);

        validation.extend_from_slice(&indices[..val_count]);
        train.extend_from_slice(&indices[val_count..]);
    }

    // Deterministic row order within each set
    train.sort_unstable();
    validation.sort_unstable();

    Ok(SplitIndices { train, validation })
}

/// Balanced class weights, sklearn-style: `n / (n_classes * n_c)`.
///
/// Returns `(weight_negative, weight_positive)`.
pub fn class_weights(labels: impl Iterator<Item = f32>) -> (f64, f64) {
    let mut neg = 0usize;
    let mut pos = 0usize;
    for y in labels {
        if y >= 0.5 {
            pos += 1;
        } else {
            neg += 1;
        }
    }
    let n = (neg + pos) as f64;
    let w_neg = if neg > 0 { n / (2.0 * neg as f64) } else { 0.0 };
    let w_pos = if pos > 0 { n / (2.0 * pos as f64) } else { 0.0 };
    (w_neg, w_pos)
}
