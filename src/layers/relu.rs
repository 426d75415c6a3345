//! ReLU activation layer.

use crate::error::NetworkError;
use crate::layers::r#trait::check_input;
use crate::layers::Layer;
use crate::tensor::Tensor;

/// Element-wise ReLU: `y[i] = max(0, x[i])`.
///
/// No learnable state; the only state is the single-call forward cache used
/// to mask the gradient on the way back.
pub struct ReluLayer {
    size: usize,
    cache: Option<Tensor>,
}

impl ReluLayer {
    pub fn new(size: usize) -> Self {
        Self { size, cache: None }
    }
}

impl Layer for ReluLayer {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, NetworkError> {
        check_input(self.name(), self.size, input)?;

        let mut output = input.clone();
        for value in output.as_mut_slice().iter_mut() {
            if *value < 0.0 {
                *value = 0.0;
            }
        }
        self.cache = Some(input.clone());
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NetworkError> {
        let cache = self
            .cache
            .take()
            .ok_or(NetworkError::NoCachedInput { layer: self.name() })?;
        check_input(self.name(), self.size, grad_output)?;

        // Gradient passes only where the cached input was strictly positive.
        let mut grad_input = grad_output.clone();
        for (dx, &x) in grad_input.as_mut_slice().iter_mut().zip(cache.as_slice()) {
            if x <= 0.0 {
                *dx = 0.0;
            }
        }
        Ok(grad_input)
    }

    fn apply_gradients(&mut self, _batch_size: usize, _learning_rate: f32) {}

    fn input_size(&self) -> usize {
        self.size
    }

    fn output_size(&self) -> usize {
        self.size
    }

    fn parameter_count(&self) -> usize {
        0
    }

    fn name(&self) -> &'static str {
        "relu"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relu_forward_known_values() {
        let mut layer = ReluLayer::new(3);
        let out = layer.forward(&Tensor::vector(vec![-1.0, 0.0, 2.0])).unwrap();
        assert_eq!(out.as_slice(), &[0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_relu_backward_masks_nonpositive() {
        let mut layer = ReluLayer::new(4);
        layer
            .forward(&Tensor::vector(vec![-2.0, 0.0, 0.5, 3.0]))
            .unwrap();
        let dx = layer
            .backward(&Tensor::vector(vec![1.0, 1.0, 1.0, 1.0]))
            .unwrap();
        assert_eq!(dx.as_slice(), &[0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_relu_backward_without_forward_errors() {
        let mut layer = ReluLayer::new(2);
        let err = layer.backward(&Tensor::vector(vec![1.0, 1.0])).unwrap_err();
        assert_eq!(err, NetworkError::NoCachedInput { layer: "relu" });
    }

    #[test]
    fn test_relu_cache_is_consumed() {
        let mut layer = ReluLayer::new(2);
        layer.forward(&Tensor::vector(vec![1.0, -1.0])).unwrap();
        layer.backward(&Tensor::vector(vec![1.0, 1.0])).unwrap();
        // Second backward without a new forward must fail.
        assert!(layer.backward(&Tensor::vector(vec![1.0, 1.0])).is_err());
    }

    #[test]
    fn test_relu_shape_mismatch() {
        let mut layer = ReluLayer::new(3);
        let err = layer.forward(&Tensor::vector(vec![1.0, 2.0])).unwrap_err();
        assert_eq!(
            err,
            NetworkError::ShapeMismatch {
                layer: "relu",
                expected: 3,
                got: 2
            }
        );
    }
}
