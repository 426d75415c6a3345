//! Layer trait definition for neural network layers
//!
//! This module defines the core Layer trait that all layer types implement.
//! The trait provides a common interface for forward propagation, backward
//! propagation, and the mini-batch gradient accumulation protocol.

use crate::error::NetworkError;
use crate::tensor::Tensor;

/// Core trait for neural network layers.
///
/// All layer types (Dense, Conv2D, ReLU, MaxPool) implement this trait so
/// a network can own them as an ordered, uniform sequence. Layers operate on
/// one sample at a time; mini-batches are expressed through the
/// accumulate-then-apply protocol rather than batched buffers.
///
/// # Contract
///
/// - `forward` caches exactly the input it saw; the cache is overwritten on
///   every call and consumed by the next `backward`.
/// - `backward` recomputes instantaneous gradients from scratch, adds them
///   into the layer's persistent accumulators, and returns the gradient with
///   respect to its input. Calling it without a preceding `forward` (or twice
///   in a row) is a `NoCachedInput` error; caches are not stacked.
/// - `apply_gradients(batch_size, lr)` scales the accumulated gradient by
///   `lr / batch_size`, subtracts it from the parameters, and zeroes the
///   accumulators. Accumulators are zero exactly at batch boundaries, so
///   applying with an already-empty accumulator is a no-op on the weights.
///   Single-sample (immediate-update) training is `apply_gradients(1, lr)`
///   after each backward pass.
pub trait Layer {
    /// Forward propagation through the layer for a single sample.
    ///
    /// Validates the input length against `input_size` and returns
    /// `NetworkError::ShapeMismatch` on disagreement.
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, NetworkError>;

    /// Backward propagation through the layer for a single sample.
    ///
    /// Takes the gradient of the loss with respect to this layer's output and
    /// returns the gradient with respect to its input. Parameterized layers
    /// also accumulate weight/bias gradients internally.
    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NetworkError>;

    /// Convert accumulated gradients into a parameter update and reset them.
    ///
    /// Performs `w -= (learning_rate / batch_size) * accumulated_grad` for
    /// every parameter. A no-op for layers without parameters.
    fn apply_gradients(&mut self, batch_size: usize, learning_rate: f32);

    /// Expected number of input values per sample.
    fn input_size(&self) -> usize;

    /// Number of output values per sample.
    fn output_size(&self) -> usize;

    /// Total count of trainable weights and biases.
    fn parameter_count(&self) -> usize;

    /// Short layer name used in error messages.
    fn name(&self) -> &'static str;
}

/// Shared length check for forward inputs and backward gradients.
pub(crate) fn check_input(
    layer: &'static str,
    expected: usize,
    input: &Tensor,
) -> Result<(), NetworkError> {
    if input.len() != expected {
        return Err(NetworkError::ShapeMismatch {
            layer,
            expected,
            got: input.len(),
        });
    }
    Ok(())
}
