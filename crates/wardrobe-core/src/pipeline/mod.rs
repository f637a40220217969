//! Image preparation pipeline: discover, validate, decode, letterbox.
//!
//! ```text
//! photo.jpg → validate → decode → letterbox (white square) → resized/photo.jpg
//! ```
//!
//! Each step fails per-item; a bad photo never aborts the batch.

mod decode;
mod discovery;
mod resize;
mod validate;

pub use decode::{format_to_string, DecodedImage, ImageDecoder};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use resize::Letterboxer;
pub use validate::Validator;

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::PipelineError;

/// A garment photo that has been resized and is ready for extraction.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    /// Garment identifier (the source file's stem)
    pub id: String,

    /// Original photo path
    pub source_path: PathBuf,

    /// Path of the letterboxed JPEG sent to the model
    pub resized_path: PathBuf,

    /// Original width in pixels
    pub width: u32,

    /// Original height in pixels
    pub height: u32,

    /// Detected source format ("jpeg", "png", ...)
    pub format: String,

    /// Original file size in bytes
    pub file_size: u64,
}

/// Prepares garment photos for attribute extraction.
pub struct ImagePreparer {
    discovery: FileDiscovery,
    validator: Validator,
    decoder: ImageDecoder,
    letterboxer: Letterboxer,
}

impl ImagePreparer {
    /// Create a preparer from the full configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            discovery: FileDiscovery::new(config.processing.clone()),
            validator: Validator::new(config.limits.clone()),
            decoder: ImageDecoder::new(config.limits.clone()),
            letterboxer: Letterboxer::new(&config.extraction),
        }
    }

    /// Discover supported photos at a file or directory path.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        self.discovery.discover(path)
    }

    /// Prepare a single photo: validate, decode, letterbox, write the
    /// resized JPEG into `resized_dir`.
    ///
    /// The resized file keeps the source stem with a `.jpg` extension; the
    /// stem doubles as the garment id in the attribute output.
    pub async fn prepare(
        &self,
        path: &Path,
        resized_dir: &Path,
    ) -> Result<PreparedImage, PipelineError> {
        self.validator.validate(path)?;

        let bytes = tokio::fs::read(path).await.map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("Cannot read file: {}", e),
        })?;
        let decoded = self.decoder.decode_from_bytes(bytes, path).await?;

        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string();
        let resized_path = resized_dir.join(format!("{id}.jpg"));

        std::fs::create_dir_all(resized_dir).map_err(|e| PipelineError::Encode {
            path: resized_dir.to_path_buf(),
            message: format!("Cannot create resized dir: {}", e),
        })?;
        self.letterboxer.write_jpeg(&decoded.image, &resized_path)?;

        tracing::debug!("Prepared {:?} -> {:?}", path, resized_path);

        Ok(PreparedImage {
            id,
            source_path: path.to_path_buf(),
            resized_path,
            width: decoded.width,
            height: decoded.height,
            format: format_to_string(decoded.format),
            file_size: decoded.file_size,
        })
    }
}
