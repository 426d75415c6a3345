//! Typed errors for the training engine
//!
//! The error taxonomy is deliberately small: construction-time and data-shape
//! errors only. Numeric computation itself never fails; degenerate softmax
//! probabilities are handled by an epsilon floor in the loss, not an error.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by layers and networks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// A layer received a tensor whose length does not match the declared
    /// size, on either the forward input or the backward gradient. Raised
    /// instead of silently reading out of bounds.
    #[error("{layer}: expected tensor of length {expected}, got {got}")]
    ShapeMismatch {
        layer: &'static str,
        expected: usize,
        got: usize,
    },

    /// `backward` was called without a preceding `forward` on the same layer
    /// (or twice without an intervening forward). Caches are not stacked.
    #[error("{layer}: backward called without a cached forward input")]
    NoCachedInput { layer: &'static str },

    /// A training step was asked to process an empty batch.
    #[error("cannot train on an empty batch")]
    EmptyBatch,

    /// A sample label is outside `[0, num_classes)`.
    #[error("label {label} out of range for {num_classes} classes")]
    InvalidLabel { label: u8, num_classes: usize },
}

/// Errors raised while reading MNIST IDX files.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("could not read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path:?}: bad IDX magic number (expected {expected:#010x}, got {got:#010x})")]
    BadMagic {
        path: PathBuf,
        expected: u32,
        got: u32,
    },

    #[error("{path:?}: unexpected image shape {rows}x{cols} (expected 28x28)")]
    UnexpectedShape {
        path: PathBuf,
        rows: usize,
        cols: usize,
    },

    #[error("{path:?}: file is truncated")]
    Truncated { path: PathBuf },

    #[error("image count {images} does not match label count {labels}")]
    CountMismatch { images: usize, labels: usize },

    #[error("label value {label} out of range 0-9")]
    InvalidLabel { label: u8 },
}

/// Errors raised while loading a training configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
