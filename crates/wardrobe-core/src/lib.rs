//! Wardrobe Core - garment attribute extraction and outfit-match training.
//!
//! The library implements a two-stage pipeline for an outfit recommendation
//! prototype:
//!
//! ```text
//! Photos → Letterbox resize → Vision LLM → Garment attributes (JSON)
//! Attributes + scored pairs → Feature encoding → 2-layer classifier → safetensors
//! ```
//!
//! The first stage prepares garment photos (square white-canvas letterbox,
//! JPEG), sends them to a multimodal model, and parses structured attributes
//! out of the free-text response. The second stage encodes top/bottom
//! attribute pairs into feature vectors and trains a small binary classifier
//! that predicts whether a combination is a good match.

// Module declarations
pub mod attributes;
pub mod config;
pub mod dataset;
pub mod error;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod train;

// Re-exports for convenient access
pub use attributes::{load_attributes, GarmentAttributes};
pub use config::Config;
pub use error::{ConfigError, DatasetError, PipelineError, PipelineResult, Result, TrainError, WardrobeError};
pub use llm::{AttributeExtractor, ExtractOptions, ExtractOutcome, LlmProvider, LlmProviderFactory};
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::{DiscoveredFile, ImagePreparer, PreparedImage};
pub use train::{Metrics, TrainOptions, Trainer, ValidationOutcome};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
