//! Shared utilities for the training engine
//!
//! Random number generation and the softmax helper used by the loss stage.

pub mod activations;
pub mod rng;

pub use activations::softmax_inplace;
pub use rng::SimpleRng;
