//! Configuration structures for training
//!
//! Training runs are configured from small JSON files; every field has a
//! default so a partial file (or no file at all) still yields a usable run.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Training hyperparameters and data location.
///
/// # Example
///
/// ```json
/// {
///   "epochs": 6,
///   "batch_size": 32,
///   "learning_rate": 0.01,
///   "seed": 42,
///   "data_dir": "./data"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of full passes over the training set.
    pub epochs: usize,

    /// Mini-batch size; 1 means per-sample SGD.
    pub batch_size: usize,

    /// SGD learning rate applied as `lr / batch_size` per accumulated batch.
    pub learning_rate: f32,

    /// Seed for weight initialization and epoch shuffling.
    pub seed: u64,

    /// Directory containing the four MNIST IDX files.
    pub data_dir: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 6,
            batch_size: 32,
            learning_rate: 0.01,
            seed: 42,
            data_dir: "./data".to_string(),
        }
    }
}

impl TrainingConfig {
    /// Reject configurations that would make the training loop degenerate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.epochs == 0 {
            return Err(ConfigError::Invalid("epochs must be positive".into()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be positive".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ConfigError::Invalid(
                "learning_rate must be positive and finite".into(),
            ));
        }
        Ok(())
    }
}

/// Load and validate a training configuration from a JSON file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TrainingConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: TrainingConfig = serde_json::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}
