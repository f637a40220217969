//! Pair dataset assembly: joining garment attributes with user-scored
//! combinations into a feature matrix the trainer consumes.

mod combinations;
mod split;

pub use combinations::{load_scored_pairs, parse_scored_pairs, ScoredPair};
pub use split::{class_weights, stratified_split, SplitIndices};

use ndarray::{Array1, Array2};
use std::collections::HashMap;

use crate::attributes::{EncodedGarment, GarmentAttributes};
use crate::error::DatasetError;

/// The attribute columns that feed the classifier, per pair side.
const FEATURE_COLUMNS: [&str; 4] = ["color1", "pattern", "material", "fit"];

/// Number of features per pair: one top and one bottom value per column,
/// interleaved.
pub const FEATURES_PER_PAIR: usize = FEATURE_COLUMNS.len() * 2;

/// A trainable dataset of encoded top/bottom pairs.
#[derive(Debug, Clone)]
pub struct PairDataset {
    /// Feature matrix, one row per surviving pair
    pub features: Array2<f32>,
    /// Binary labels: 1.0 good match, 0.0 bad match
    pub labels: Array1<f32>,
}

impl PairDataset {
    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the dataset has no pairs.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Feature vector width.
    pub fn feature_dim(&self) -> usize {
        self.features.ncols()
    }
}

/// Assemble a dataset from extracted attributes and scored combinations.
///
/// Filtering, in order:
/// - garments with out-of-vocabulary attribute values are dropped (warned
///   by the encoder),
/// - neutral pairs (score 0) are dropped,
/// - pairs referencing a missing or dropped garment are skipped with a log.
///
/// Labels: score 1 → 1.0, score -1 → 0.0.
pub fn build_dataset(
    attributes: &[GarmentAttributes],
    pairs: &[ScoredPair],
) -> Result<PairDataset, DatasetError> {
    let garments: HashMap<&str, EncodedGarment> = attributes
        .iter()
        .filter_map(|a| a.encode().map(|e| (a.id.as_str(), e)))
        .collect();

    let mut rows: Vec<f32> = Vec::new();
    let mut labels: Vec<f32> = Vec::new();
    let mut skipped_unmatched = 0usize;

    for pair in pairs {
        if pair.score == 0 {
            continue; // Neutral — the user had no opinion
        }

        let (Some(top), Some(bottom)) = (
            garments.get(pair.top_id.as_str()),
            garments.get(pair.bottom_id.as_str()),
        ) else {
            skipped_unmatched += 1;
            tracing::debug!(
                "Skipping pair {}:{} — missing garment attributes",
                pair.top_id,
                pair.bottom_id
            );
            continue;
        };

        rows.extend_from_slice(&pair_features(top, bottom));
        labels.push(if pair.score == 1 { 1.0 } else { 0.0 });
    }

    if skipped_unmatched > 0 {
        tracing::warn!("Skipped {skipped_unmatched} pair(s) without matching attributes");
    }

    if labels.is_empty() {
        return Err(DatasetError::Empty);
    }
    let positives = labels.iter().filter(|&&y| y == 1.0).count();
    if positives == 0 || positives == labels.len() {
        return Err(DatasetError::SingleClass);
    }

    let n = labels.len();
    let features = Array2::from_shape_vec((n, FEATURES_PER_PAIR), rows)
        .expect("row count and feature width are consistent by construction");

    tracing::info!("Assembled dataset: {} pairs x {} features", n, FEATURES_PER_PAIR);

    Ok(PairDataset {
        features,
        labels: Array1::from_vec(labels),
    })
}

/// Interleave the top and bottom codes column by column:
/// [top.color1, bottom.color1, top.pattern, bottom.pattern, ...].
fn pair_features(top: &EncodedGarment, bottom: &EncodedGarment) -> [f32; FEATURES_PER_PAIR] {
    [
        top.color1 as f32,
        bottom.color1 as f32,
        top.pattern as f32,
        bottom.pattern as f32,
        top.material as f32,
        bottom.material as f32,
        top.fit as f32,
        bottom.fit as f32,
    ]
}
