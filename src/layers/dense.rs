//! Dense (fully connected) layer implementation
//!
//! Performs `y[o] = b[o] + sum_i x[i] * W[o * in + i]` for a single sample,
//! with weight rows stored output-major.

use crate::error::NetworkError;
use crate::layers::r#trait::check_input;
use crate::layers::Layer;
use crate::tensor::Tensor;
use crate::utils::SimpleRng;

/// Dense (fully connected) layer with weights and biases.
///
/// Weights are a flat `output_size x input_size` matrix indexed as
/// `weights[o * input_size + i]`; biases have one entry per output.
///
/// The layer keeps two kinds of gradient storage:
///
/// - `grad_weights`/`grad_biases`: instantaneous per-sample gradients,
///   fully recomputed (zeroed then filled) on every backward call;
/// - `acc_weights`/`acc_biases`: the mini-batch accumulators, added to by
///   every backward call and zeroed only by `apply_gradients`.
///
/// # Example
///
/// ```
/// use mnist_backprop::layers::{DenseLayer, Layer};
/// use mnist_backprop::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let layer = DenseLayer::new(784, 256, &mut rng);
/// assert_eq!(layer.input_size(), 784);
/// assert_eq!(layer.output_size(), 256);
/// assert_eq!(layer.parameter_count(), 784 * 256 + 256);
/// ```
pub struct DenseLayer {
    input_size: usize,
    output_size: usize,
    weights: Vec<f32>,
    biases: Vec<f32>,
    grad_weights: Vec<f32>,
    grad_biases: Vec<f32>,
    acc_weights: Vec<f32>,
    acc_biases: Vec<f32>,
    cache: Option<Tensor>,
}

impl DenseLayer {
    /// Create a new DenseLayer.
    ///
    /// Weights are sampled uniformly from `[-0.05, 0.05)` using the shared
    /// generator; biases start at zero. Construction order across a network
    /// is part of the determinism contract.
    pub fn new(input_size: usize, output_size: usize, rng: &mut SimpleRng) -> Self {
        let weight_count = input_size * output_size;
        let mut weights = vec![0.0f32; weight_count];
        for value in &mut weights {
            *value = rng.gen_range_f32(-0.05, 0.05);
        }

        Self {
            input_size,
            output_size,
            weights,
            biases: vec![0.0f32; output_size],
            grad_weights: vec![0.0f32; weight_count],
            grad_biases: vec![0.0f32; output_size],
            acc_weights: vec![0.0f32; weight_count],
            acc_biases: vec![0.0f32; output_size],
            cache: None,
        }
    }

    /// Weight matrix, `weights[o * input_size + i]`.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Mutable weight access, used by gradient-checking tests.
    pub fn weights_mut(&mut self) -> &mut [f32] {
        &mut self.weights
    }

    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    pub fn biases_mut(&mut self) -> &mut [f32] {
        &mut self.biases
    }

    /// Accumulated weight gradients for the current mini-batch.
    pub fn accumulated_weight_grads(&self) -> &[f32] {
        &self.acc_weights
    }

    /// Accumulated bias gradients for the current mini-batch.
    pub fn accumulated_bias_grads(&self) -> &[f32] {
        &self.acc_biases
    }
}

impl Layer for DenseLayer {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, NetworkError> {
        check_input(self.name(), self.input_size, input)?;

        let mut output = Tensor::zeros(&[self.output_size]);
        for o in 0..self.output_size {
            let row = &self.weights[o * self.input_size..(o + 1) * self.input_size];
            let mut sum = self.biases[o];
            for (i, &w) in row.iter().enumerate() {
                sum += input[i] * w;
            }
            output[o] = sum;
        }

        self.cache = Some(input.clone());
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NetworkError> {
        let cache = self
            .cache
            .take()
            .ok_or(NetworkError::NoCachedInput { layer: self.name() })?;
        check_input(self.name(), self.output_size, grad_output)?;

        // Instantaneous gradients are recomputed from scratch every call.
        self.grad_weights.fill(0.0);
        self.grad_biases.fill(0.0);
        let mut grad_input = Tensor::zeros(&[self.input_size]);

        for o in 0..self.output_size {
            let g = grad_output[o];
            self.grad_biases[o] += g;

            let row_base = o * self.input_size;
            for i in 0..self.input_size {
                self.grad_weights[row_base + i] += cache[i] * g;
                grad_input[i] += self.weights[row_base + i] * g;
            }
        }

        // Fold this sample into the mini-batch accumulators.
        for (acc, g) in self.acc_weights.iter_mut().zip(&self.grad_weights) {
            *acc += g;
        }
        for (acc, g) in self.acc_biases.iter_mut().zip(&self.grad_biases) {
            *acc += g;
        }

        Ok(grad_input)
    }

    fn apply_gradients(&mut self, batch_size: usize, learning_rate: f32) {
        let inv = learning_rate / batch_size as f32;
        for (w, g) in self.weights.iter_mut().zip(self.acc_weights.iter_mut()) {
            *w -= inv * *g;
            *g = 0.0;
        }
        for (b, g) in self.biases.iter_mut().zip(self.acc_biases.iter_mut()) {
            *b -= inv * *g;
            *g = 0.0;
        }
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.output_size
    }

    fn parameter_count(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    fn name(&self) -> &'static str {
        "dense"
    }
}
