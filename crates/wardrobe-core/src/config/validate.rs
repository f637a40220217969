//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.llm_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.llm_timeout_ms must be > 0".into(),
            ));
        }
        if self.extraction.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "extraction.image_size must be > 0".into(),
            ));
        }
        if self.extraction.jpeg_quality == 0 || self.extraction.jpeg_quality > 100 {
            return Err(ConfigError::ValidationError(
                "extraction.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if self.extraction.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "extraction.max_tokens must be > 0".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.extraction.temperature) {
            return Err(ConfigError::ValidationError(
                "extraction.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.training.hidden_units == 0 {
            return Err(ConfigError::ValidationError(
                "training.hidden_units must be > 0".into(),
            ));
        }
        if self.training.learning_rate <= 0.0 {
            return Err(ConfigError::ValidationError(
                "training.learning_rate must be > 0".into(),
            ));
        }
        if self.training.max_epochs == 0 {
            return Err(ConfigError::ValidationError(
                "training.max_epochs must be > 0".into(),
            ));
        }
        if self.training.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "training.batch_size must be > 0".into(),
            ));
        }
        if self.training.validation_split <= 0.0 || self.training.validation_split >= 1.0 {
            return Err(ConfigError::ValidationError(
                "training.validation_split must be strictly between 0.0 and 1.0".into(),
            ));
        }
        Ok(())
    }
}
