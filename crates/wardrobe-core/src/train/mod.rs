//! Classifier training: validation run with epoch checkpointing, then a
//! final retrain at the best epoch count.
//!
//! The validation run holds out a stratified slice of the pairs, trains up
//! to `max_epochs`, and snapshots the weights (safetensors) every time
//! validation accuracy improves. The final run trains on every pair for
//! exactly the winning epoch count and exports the deployable weight file.

mod metrics;
mod model;

pub use metrics::Metrics;
pub use model::MatchModel;

use candle_core::{DType, Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;

use crate::config::TrainingConfig;
use crate::dataset::{class_weights, stratified_split, PairDataset};
use crate::error::TrainError;

/// Hyperparameters for a training run.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Width of the hidden layer
    pub hidden_units: usize,
    /// Adam learning rate
    pub learning_rate: f64,
    /// Upper bound on epochs for the validation run
    pub max_epochs: usize,
    /// Minibatch size
    pub batch_size: usize,
    /// Held-out fraction for validation
    pub validation_split: f64,
    /// Seed for splitting and epoch shuffling
    pub seed: u64,
}

impl From<&TrainingConfig> for TrainOptions {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            hidden_units: config.hidden_units,
            learning_rate: config.learning_rate,
            max_epochs: config.max_epochs,
            batch_size: config.batch_size,
            validation_split: config.validation_split,
            seed: config.seed,
        }
    }
}

/// Result of the validation run.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    /// Epoch (1-based) with the highest validation accuracy
    pub best_epoch: usize,
    /// The accuracy that epoch reached
    pub best_val_accuracy: f32,
    /// Metrics on the validation set with the best weights restored
    pub metrics: Metrics,
}

/// Trains the outfit-match classifier.
pub struct Trainer {
    options: TrainOptions,
    device: Device,
}

impl Trainer {
    pub fn new(options: TrainOptions) -> Self {
        Self {
            options,
            device: Device::Cpu,
        }
    }

    /// Train with a held-out validation set, checkpointing the best weights
    /// to `checkpoint`, and return the winning epoch and its metrics.
    pub fn train_validate(
        &self,
        dataset: &PairDataset,
        checkpoint: &Path,
    ) -> Result<ValidationOutcome, TrainError> {
        ensure_parent_dir(checkpoint)?;

        let split = stratified_split(
            &dataset.labels,
            self.options.validation_split,
            self.options.seed,
        )?;
        let (w_neg, w_pos) = class_weights(split.train.iter().map(|&i| dataset.labels[i]));
        tracing::info!(
            "Training on {} pairs, validating on {} (class weights: {:.3}/{:.3})",
            split.train.len(),
            split.validation.len(),
            w_neg,
            w_pos
        );

        let mut varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &self.device);
        let model = MatchModel::new(vb, dataset.feature_dim(), self.options.hidden_units)?;
        let mut opt = AdamW::new(
            varmap.all_vars(),
            ParamsAdamW {
                lr: self.options.learning_rate,
                weight_decay: 0.0, // plain Adam
                ..Default::default()
            },
        )?;

        let mut rng = StdRng::seed_from_u64(self.options.seed);
        let mut train_indices = split.train.clone();
        let mut best_epoch = 0usize;
        let mut best_val_accuracy = f32::NEG_INFINITY;

        for epoch in 1..=self.options.max_epochs {
            train_indices.shuffle(&mut rng);
            let loss = self.run_epoch(&model, &mut opt, dataset, &train_indices, w_neg, w_pos)?;

            let (preds, labels) = self.predict(&model, dataset, &split.validation)?;
            let val_accuracy = Metrics::compute(&preds, &labels).accuracy;

            if epoch % 100 == 0 {
                tracing::debug!(
                    "epoch {epoch}: loss {loss:.4}, val accuracy {val_accuracy:.3}"
                );
            }

            // Strict improvement keeps the first epoch at the maximum
            if val_accuracy > best_val_accuracy {
                best_val_accuracy = val_accuracy;
                best_epoch = epoch;
                varmap.save(checkpoint).map_err(|e| TrainError::Checkpoint {
                    path: checkpoint.to_path_buf(),
                    message: e.to_string(),
                })?;
            }
        }

        // Restore the best weights before computing final validation metrics
        varmap.load(checkpoint).map_err(|e| TrainError::Checkpoint {
            path: checkpoint.to_path_buf(),
            message: e.to_string(),
        })?;
        let (preds, labels) = self.predict(&model, dataset, &split.validation)?;
        let metrics = Metrics::compute(&preds, &labels);

        tracing::info!(
            "Best epoch {} (val accuracy {:.3}): precision {:.3}, recall {:.3}, F1 {:.3}",
            best_epoch,
            best_val_accuracy,
            metrics.precision,
            metrics.recall,
            metrics.f1
        );

        Ok(ValidationOutcome {
            best_epoch,
            best_val_accuracy,
            metrics,
        })
    }

    /// Retrain on the full dataset for exactly `epochs` epochs and export
    /// the weights to `model_out`.
    pub fn train_final(
        &self,
        dataset: &PairDataset,
        epochs: usize,
        model_out: &Path,
    ) -> Result<(), TrainError> {
        ensure_parent_dir(model_out)?;

        let (w_neg, w_pos) = class_weights(dataset.labels.iter().copied());

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &self.device);
        let model = MatchModel::new(vb, dataset.feature_dim(), self.options.hidden_units)?;
        let mut opt = AdamW::new(
            varmap.all_vars(),
            ParamsAdamW {
                lr: self.options.learning_rate,
                weight_decay: 0.0,
                ..Default::default()
            },
        )?;

        let mut rng = StdRng::seed_from_u64(self.options.seed);
        let mut indices: Vec<usize> = (0..dataset.len()).collect();

        for epoch in 1..=epochs {
            indices.shuffle(&mut rng);
            let loss = self.run_epoch(&model, &mut opt, dataset, &indices, w_neg, w_pos)?;
            if epoch % 100 == 0 {
                tracing::debug!("final model epoch {epoch}: loss {loss:.4}");
            }
        }

        varmap.save(model_out).map_err(|e| TrainError::Checkpoint {
            path: model_out.to_path_buf(),
            message: e.to_string(),
        })?;
        tracing::info!("Exported classifier weights to {:?}", model_out);
        Ok(())
    }

    /// One pass of shuffled minibatches; returns the mean batch loss.
    fn run_epoch(
        &self,
        model: &MatchModel,
        opt: &mut AdamW,
        dataset: &PairDataset,
        indices: &[usize],
        w_neg: f64,
        w_pos: f64,
    ) -> Result<f32, TrainError> {
        let mut total = 0.0f32;
        let mut batches = 0usize;

        for chunk in indices.chunks(self.options.batch_size) {
            let (xs, ys) = self.batch_tensors(dataset, chunk)?;
            let probs = model.forward(&xs)?;
            let loss = weighted_bce(&probs, &ys, w_neg, w_pos)?;
            opt.backward_step(&loss)?;
            total += loss.to_scalar::<f32>()?;
            batches += 1;
        }

        Ok(if batches > 0 { total / batches as f32 } else { 0.0 })
    }

    /// Thresholded predictions and labels for the given rows.
    fn predict(
        &self,
        model: &MatchModel,
        dataset: &PairDataset,
        indices: &[usize],
    ) -> Result<(Vec<bool>, Vec<bool>), TrainError> {
        let (xs, _) = self.batch_tensors(dataset, indices)?;
        let probs = model.forward(&xs)?.flatten_all()?.to_vec1::<f32>()?;
        let preds = probs.iter().map(|&p| p > 0.5).collect();
        let labels = indices.iter().map(|&i| dataset.labels[i] >= 0.5).collect();
        Ok((preds, labels))
    }

    /// Gather dataset rows into (features, labels) tensors of shape
    /// (n, dim) and (n, 1).
    fn batch_tensors(
        &self,
        dataset: &PairDataset,
        indices: &[usize],
    ) -> Result<(Tensor, Tensor), TrainError> {
        let dim = dataset.feature_dim();
        let mut xs = Vec::with_capacity(indices.len() * dim);
        let mut ys = Vec::with_capacity(indices.len());
        for &i in indices {
            xs.extend(dataset.features.row(i).iter().copied());
            ys.push(dataset.labels[i]);
        }
        let x = Tensor::from_vec(xs, (indices.len(), dim), &self.device)?;
        let y = Tensor::from_vec(ys, (indices.len(), 1), &self.device)?;
        Ok((x, y))
    }
}

/// Class-weighted binary cross-entropy over probabilities.
///
/// Probabilities are clamped away from 0 and 1 before the log so a saturated
/// sigmoid cannot produce infinities.
fn weighted_bce(
    probs: &Tensor,
    targets: &Tensor,
    w_neg: f64,
    w_pos: f64,
) -> candle_core::Result<Tensor> {
    let probs = probs.clamp(1e-7f32, 1.0f32 - 1e-7)?;
    let pos_term = targets.mul(&probs.log()?)?.affine(w_pos, 0.0)?;
    let neg_term = targets
        .affine(-1.0, 1.0)?
        .mul(&probs.affine(-1.0, 1.0)?.log()?)?
        .affine(w_neg, 0.0)?;
    pos_term.add(&neg_term)?.neg()?.mean_all()
}

fn ensure_parent_dir(path: &Path) -> Result<(), TrainError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| TrainError::Checkpoint {
                path: path.to_path_buf(),
                message: format!("Cannot create parent directory: {e}"),
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    /// Linearly separable toy pairs: the first two features carry the label.
    fn toy_dataset(n: usize) -> PairDataset {
        let dim = 8;
        let mut features = Vec::with_capacity(n * dim);
        let mut labels = Vec::with_capacity(n);
        for i in 0..n {
            let positive = i % 2 == 0;
            let mut row = vec![0.0f32; dim];
            row[0] = if positive { 3.0 } else { -3.0 };
            row[1] = if positive { 2.0 } else { -2.0 };
            // Mild per-row variation so rows are not identical
            row[2] = (i % 4) as f32 * 0.1;
            features.extend(row);
            labels.push(if positive { 1.0 } else { 0.0 });
        }
        PairDataset {
            features: Array2::from_shape_vec((n, dim), features).unwrap(),
            labels: Array1::from_vec(labels),
        }
    }

    fn fast_options() -> TrainOptions {
        TrainOptions {
            hidden_units: 4,
            learning_rate: 0.05,
            max_epochs: 60,
            batch_size: 4,
            validation_split: 0.25,
            seed: 42,
        }
    }

    #[test]
    fn test_weighted_bce_known_value() {
        let device = Device::Cpu;
        let probs = Tensor::from_vec(vec![0.5f32], (1, 1), &device).unwrap();
        let targets = Tensor::from_vec(vec![1.0f32], (1, 1), &device).unwrap();
        let loss = weighted_bce(&probs, &targets, 1.0, 1.0)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        // -ln(0.5)
        assert!((loss - 0.6931).abs() < 1e-3);
    }

    #[test]
    fn test_weighted_bce_applies_class_weight() {
        let device = Device::Cpu;
        let probs = Tensor::from_vec(vec![0.5f32], (1, 1), &device).unwrap();
        let targets = Tensor::from_vec(vec![1.0f32], (1, 1), &device).unwrap();
        let unweighted = weighted_bce(&probs, &targets, 1.0, 1.0)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        let weighted = weighted_bce(&probs, &targets, 1.0, 2.0)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!((weighted - 2.0 * unweighted).abs() < 1e-4);
    }

    #[test]
    fn test_weighted_bce_survives_saturated_probs() {
        let device = Device::Cpu;
        let probs = Tensor::from_vec(vec![0.0f32, 1.0], (2, 1), &device).unwrap();
        let targets = Tensor::from_vec(vec![1.0f32, 0.0], (2, 1), &device).unwrap();
        let loss = weighted_bce(&probs, &targets, 1.0, 1.0)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!(loss.is_finite());
    }

    #[test]
    fn test_train_validate_checkpoints_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = dir.path().join("checkpoint.safetensors");

        let dataset = toy_dataset(16);
        let trainer = Trainer::new(fast_options());
        let outcome = trainer.train_validate(&dataset, &checkpoint).unwrap();

        assert!(checkpoint.exists());
        assert!(outcome.best_epoch >= 1);
        assert!(outcome.best_epoch <= 60);
        assert!((0.0..=1.0).contains(&outcome.metrics.accuracy));
        // Separable data with balanced classes: never worse than a constant guess
        assert!(outcome.metrics.accuracy >= 0.5);
    }

    #[test]
    fn test_train_final_exports_loadable_weights() {
        let dir = tempfile::tempdir().unwrap();
        let model_out = dir.path().join("match.safetensors");

        let dataset = toy_dataset(12);
        let trainer = Trainer::new(fast_options());
        trainer.train_final(&dataset, 5, &model_out).unwrap();

        assert!(model_out.exists());

        // The exported file restores into a freshly built model
        let device = Device::Cpu;
        let mut varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let _model = MatchModel::new(vb, dataset.feature_dim(), 4).unwrap();
        varmap.load(&model_out).unwrap();
    }

    #[test]
    fn test_train_validate_rejects_single_class() {
        let dir = tempfile::tempdir().unwrap();
        let mut dataset = toy_dataset(8);
        dataset.labels.fill(1.0);

        let trainer = Trainer::new(fast_options());
        let err = trainer
            .train_validate(&dataset, &dir.path().join("c.safetensors"))
            .unwrap_err();
        assert!(matches!(err, TrainError::Dataset(_)));
    }

    #[test]
    fn test_train_options_from_config() {
        let config = TrainingConfig::default();
        let options = TrainOptions::from(&config);
        assert_eq!(options.hidden_units, 4);
        assert_eq!(options.max_epochs, 1000);
        assert!((options.learning_rate - 2e-4).abs() < 1e-12);
    }
}
