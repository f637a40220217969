//! The `wardrobe train` command: assemble the pair dataset, pick the best
//! epoch on a validation split, then retrain and export the final weights.

use clap::Args;
use std::path::PathBuf;

use wardrobe_core::dataset::{build_dataset, load_scored_pairs};
use wardrobe_core::{load_attributes, Config, TrainOptions, Trainer};

/// Arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Garment attribute JSON produced by `wardrobe extract`
    #[arg(required = true)]
    pub attributes: PathBuf,

    /// Scored combination file (one `top:<id>,bottom:<id>,<score>` per line)
    #[arg(required = true)]
    pub combinations: PathBuf,

    /// Checkpoint path for the best validation weights
    /// (defaults to <model_dir>/checkpoint.safetensors)
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Output path for the final exported weights
    /// (defaults to <model_dir>/outfit-match.safetensors)
    #[arg(long)]
    pub model_out: Option<PathBuf>,

    /// Override the configured epoch cap for the validation run
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Override the configured split/shuffle seed
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Execute the train command.
pub async fn execute(args: TrainArgs) -> anyhow::Result<()> {
    let config = Config::load()?;

    let attributes = load_attributes(&args.attributes)?;
    let pairs = load_scored_pairs(&args.combinations)?;
    tracing::info!(
        "Loaded {} garment(s) and {} scored pair(s)",
        attributes.len(),
        pairs.len()
    );

    let dataset = build_dataset(&attributes, &pairs)?;

    let mut options = TrainOptions::from(&config.training);
    if let Some(epochs) = args.epochs {
        options.max_epochs = epochs;
    }
    if let Some(seed) = args.seed {
        options.seed = seed;
    }

    let model_dir = config.model_dir();
    let checkpoint = args
        .checkpoint
        .unwrap_or_else(|| model_dir.join("checkpoint.safetensors"));
    let model_out = args
        .model_out
        .unwrap_or_else(|| model_dir.join("outfit-match.safetensors"));

    let trainer = Trainer::new(options);
    let outcome = trainer.train_validate(&dataset, &checkpoint)?;
    trainer.train_final(&dataset, outcome.best_epoch, &model_out)?;

    // Machine-readable report on stdout; logs stay on stderr
    let report = serde_json::json!({
        "pairs": dataset.len(),
        "best_epoch": outcome.best_epoch,
        "val_accuracy": outcome.best_val_accuracy,
        "precision": outcome.metrics.precision,
        "recall": outcome.metrics.recall,
        "f1": outcome.metrics.f1,
        "checkpoint": checkpoint.display().to_string(),
        "model": model_out.display().to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
