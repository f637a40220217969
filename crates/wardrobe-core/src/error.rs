//! Error types for the wardrobe pipeline.
//!
//! Errors are organized by stage so callers get actionable messages with
//! the relevant context (file paths, line numbers, HTTP status codes).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for wardrobe operations.
#[derive(Error, Debug)]
pub enum WardrobeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Image preparation and extraction errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Dataset loading and assembly errors
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Classifier training errors
    #[error("Training error: {0}")]
    Train(#[from] TrainError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Image preparation and LLM extraction errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Writing the resized image failed
    #[error("Encode error for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// LLM request failed
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        status_code: Option<u16>,
    },

    /// The LLM response could not be parsed into garment attributes
    #[error("Attribute parse error for {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

/// Dataset loading and assembly errors.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// An input file could not be read
    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// The attributes file is not valid JSON
    #[error("Failed to parse attributes file {path}: {message}")]
    ParseAttributes { path: PathBuf, message: String },

    /// A scored-combination line does not match `top:<id>,bottom:<id>,<score>`
    #[error("Malformed combination on line {line}: {message}")]
    MalformedPair { line: usize, message: String },

    /// No trainable pairs survived filtering
    #[error("Dataset is empty after filtering neutral and unmatched pairs")]
    Empty,

    /// A label class has too few pairs to stratify and train on
    #[error("Each label class needs at least 2 pairs to stratify and train")]
    SingleClass,
}

/// Classifier training errors.
#[derive(Error, Debug)]
pub enum TrainError {
    /// Model construction or tensor operation failed
    #[error("Model error: {0}")]
    Model(#[from] candle_core::Error),

    /// Checkpoint save/load failed
    #[error("Checkpoint error for {path}: {message}")]
    Checkpoint { path: PathBuf, message: String },

    /// The dataset is unusable for training
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Convenience type alias for wardrobe results.
pub type Result<T> = std::result::Result<T, WardrobeError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
