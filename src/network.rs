//! Fixed-topology networks and the training-step operations
//!
//! A network owns its layers as an ordered sequence and threads a single
//! sample through them; the softmax cross-entropy loss and its closed-form
//! gradient live in the training step, not in a layer.

use crate::error::NetworkError;
use crate::layers::{Conv2DLayer, DenseLayer, Layer, MaxPoolLayer, ReluLayer};
use crate::tensor::Tensor;
use crate::utils::{softmax_inplace, SimpleRng};

/// Epsilon floor on the predicted probability of the true class, preventing
/// `-inf` loss when the softmax underflows.
const LOSS_EPS: f32 = 1e-7;

/// Fixed pipeline of layers with a softmax cross-entropy training step.
///
/// Two pipelines are supported, both taking a flattened 28x28 image (784
/// values) and producing 10 class logits:
///
/// - [`Network::mlp`]: Dense(784→256) → ReLU → Dense(256→128) → ReLU →
///   Dense(128→64) → ReLU → Dense(64→10)
/// - [`Network::cnn`]: Conv2D(1→8, 3x3, pad 1) → ReLU → MaxPool2x2 →
///   Dense(8·14·14→10)
///
/// The network owns every layer instance for the lifetime of a training run;
/// topology never changes after construction.
///
/// # Training protocol
///
/// `train_one` runs one forward/backward pass and accumulates gradients
/// without touching the weights; `train_batch` does this for every sample of
/// a mini-batch and then applies the accumulated gradients once, scaled by
/// `learning_rate / batch_len`. A mini-batch of size 1 reproduces classic
/// per-sample SGD exactly, so there is a single update code path.
pub struct Network {
    layers: Vec<Box<dyn Layer>>,
    num_classes: usize,
    learning_rate: f32,
}

impl Network {
    const IMG_H: usize = 28;
    const IMG_W: usize = 28;
    const NUM_CLASSES: usize = 10;

    /// Fully connected pipeline: 784 → 256 → 128 → 64 → 10 with ReLU between
    /// dense layers.
    ///
    /// Layers consume the generator in declared order, so the same seed
    /// always produces the same initial parameters.
    pub fn mlp(learning_rate: f32, rng: &mut SimpleRng) -> Self {
        let layers: Vec<Box<dyn Layer>> = vec![
            Box::new(DenseLayer::new(Self::IMG_H * Self::IMG_W, 256, rng)),
            Box::new(ReluLayer::new(256)),
            Box::new(DenseLayer::new(256, 128, rng)),
            Box::new(ReluLayer::new(128)),
            Box::new(DenseLayer::new(128, 64, rng)),
            Box::new(ReluLayer::new(64)),
            Box::new(DenseLayer::new(64, Self::NUM_CLASSES, rng)),
        ];
        Self {
            layers,
            num_classes: Self::NUM_CLASSES,
            learning_rate,
        }
    }

    /// Convolutional pipeline: Conv2D(1→8, 3x3, pad 1) → ReLU → MaxPool2x2 →
    /// Dense(8·14·14 → 10).
    pub fn cnn(learning_rate: f32, rng: &mut SimpleRng) -> Self {
        const CONV_OUT: usize = 8;
        let pool_h = Self::IMG_H / 2;
        let pool_w = Self::IMG_W / 2;

        let layers: Vec<Box<dyn Layer>> = vec![
            Box::new(Conv2DLayer::new(
                1,
                CONV_OUT,
                3,
                1,
                Self::IMG_H,
                Self::IMG_W,
                rng,
            )),
            Box::new(ReluLayer::new(CONV_OUT * Self::IMG_H * Self::IMG_W)),
            Box::new(MaxPoolLayer::new(CONV_OUT, Self::IMG_H, Self::IMG_W)),
            Box::new(DenseLayer::new(
                CONV_OUT * pool_h * pool_w,
                Self::NUM_CLASSES,
                rng,
            )),
        ];
        Self {
            layers,
            num_classes: Self::NUM_CLASSES,
            learning_rate,
        }
    }

    /// Build a network from an explicit layer sequence.
    ///
    /// Used by tests that need small custom pipelines; the fixed constructors
    /// above are the supported topologies.
    pub fn from_layers(
        layers: Vec<Box<dyn Layer>>,
        num_classes: usize,
        learning_rate: f32,
    ) -> Self {
        Self {
            layers,
            num_classes,
            learning_rate,
        }
    }

    /// Expected input length (784 for both pipelines).
    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.input_size())
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Total trainable parameter count across all layers.
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.parameter_count()).sum()
    }

    /// Forward pass: threads the tensor through every layer in declared
    /// order and returns the final logits (one per class).
    pub fn forward(&mut self, input: &Tensor) -> Result<Tensor, NetworkError> {
        let mut current = input.clone();
        for layer in &mut self.layers {
            current = layer.forward(&current)?;
        }
        Ok(current)
    }

    /// One accumulating training step on a single sample.
    ///
    /// Runs the forward pass, computes softmax probabilities (with
    /// max-subtraction), the cross-entropy loss `-ln(max(p[label], 1e-7))`
    /// and the closed-form logit gradient `p[i] - 1[i == label]`, then runs
    /// backward through every layer in reverse order. Gradients accumulate in
    /// each parameterized layer; weights are untouched until
    /// [`apply_gradients`](Self::apply_gradients).
    pub fn train_one(&mut self, input: &Tensor, label: u8) -> Result<f32, NetworkError> {
        if (label as usize) >= self.num_classes {
            return Err(NetworkError::InvalidLabel {
                label,
                num_classes: self.num_classes,
            });
        }

        let logits = self.forward(input)?;

        let mut probs = logits;
        softmax_inplace(probs.as_mut_slice());

        let y = label as usize;
        let loss = -probs[y].max(LOSS_EPS).ln();

        // d(loss)/d(logit) = p - onehot(label)
        let mut grad = probs;
        grad[y] -= 1.0;

        for layer in self.layers.iter_mut().rev() {
            grad = layer.backward(&grad)?;
        }

        Ok(loss)
    }

    /// Apply accumulated gradients on every layer, scaled by
    /// `learning_rate / batch_size`, and reset the accumulators.
    pub fn apply_gradients(&mut self, batch_size: usize) {
        for layer in &mut self.layers {
            layer.apply_gradients(batch_size, self.learning_rate);
        }
    }

    /// Train on one mini-batch and return its mean loss.
    ///
    /// Runs an accumulating [`train_one`](Self::train_one) for every index in
    /// `batch_idx`, then applies the accumulated gradients exactly once,
    /// dividing by the actual batch length. A final partial batch divides by
    /// its own size, so batch training is always equivalent to averaging the
    /// per-sample gradients and applying once at the configured rate.
    pub fn train_batch(
        &mut self,
        images: &[Tensor],
        labels: &[u8],
        batch_idx: &[usize],
    ) -> Result<f32, NetworkError> {
        if batch_idx.is_empty() {
            return Err(NetworkError::EmptyBatch);
        }

        let mut loss_sum = 0.0f32;
        for &i in batch_idx {
            loss_sum += self.train_one(&images[i], labels[i])?;
        }

        self.apply_gradients(batch_idx.len());
        Ok(loss_sum / batch_idx.len() as f32)
    }

    /// Predicted class: index of the maximum logit, first index on ties.
    /// Always in `[0, num_classes)`.
    pub fn predict(&mut self, input: &Tensor) -> Result<usize, NetworkError> {
        Ok(self.forward(input)?.argmax())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample(rng: &mut SimpleRng) -> Tensor {
        Tensor::random_uniform(&[1, 28, 28], 0.0, 1.0, rng)
    }

    #[test]
    fn test_mlp_topology() {
        let mut rng = SimpleRng::new(42);
        let net = Network::mlp(0.01, &mut rng);

        assert_eq!(net.input_size(), 784);
        assert_eq!(net.num_classes(), 10);
        let expected = 784 * 256 + 256 + 256 * 128 + 128 + 128 * 64 + 64 + 64 * 10 + 10;
        assert_eq!(net.parameter_count(), expected);
    }

    #[test]
    fn test_cnn_topology() {
        let mut rng = SimpleRng::new(42);
        let net = Network::cnn(0.01, &mut rng);

        assert_eq!(net.input_size(), 784);
        let expected = 8 * 9 + 8 + 8 * 14 * 14 * 10 + 10;
        assert_eq!(net.parameter_count(), expected);
    }

    #[test]
    fn test_forward_returns_logits() {
        let mut rng = SimpleRng::new(42);
        let mut net = Network::cnn(0.01, &mut rng);
        let x = sample(&mut rng);

        let logits = net.forward(&x).unwrap();
        assert_eq!(logits.len(), 10);
    }

    #[test]
    fn test_predict_matches_forward_argmax() {
        let mut rng = SimpleRng::new(7);
        let mut net = Network::mlp(0.01, &mut rng);
        let x = sample(&mut rng);

        let logits = net.forward(&x).unwrap();
        let predicted = net.predict(&x).unwrap();
        assert_eq!(predicted, logits.argmax());
        assert!(predicted < net.num_classes());
    }

    #[test]
    fn test_train_one_does_not_update_weights() {
        let mut rng = SimpleRng::new(3);
        let mut net = Network::mlp(0.1, &mut rng);
        let x = sample(&mut rng);

        let before = net.forward(&x).unwrap();
        net.train_one(&x, 3).unwrap();
        let after = net.forward(&x).unwrap();

        // Gradients only accumulated; logits unchanged until apply.
        assert_eq!(before.as_slice(), after.as_slice());
    }

    #[test]
    fn test_train_batch_updates_weights() {
        let mut rng = SimpleRng::new(3);
        let mut net = Network::mlp(0.1, &mut rng);
        let images = vec![sample(&mut rng), sample(&mut rng)];
        let labels = vec![1u8, 4u8];

        let before = net.forward(&images[0]).unwrap();
        let loss = net.train_batch(&images, &labels, &[0, 1]).unwrap();
        let after = net.forward(&images[0]).unwrap();

        assert!(loss.is_finite() && loss > 0.0);
        assert_ne!(before.as_slice(), after.as_slice());
    }

    #[test]
    fn test_train_batch_empty_errors() {
        let mut rng = SimpleRng::new(3);
        let mut net = Network::mlp(0.1, &mut rng);
        let err = net.train_batch(&[], &[], &[]).unwrap_err();
        assert_eq!(err, NetworkError::EmptyBatch);
    }

    #[test]
    fn test_invalid_label_rejected() {
        let mut rng = SimpleRng::new(3);
        let mut net = Network::mlp(0.1, &mut rng);
        let x = sample(&mut rng);

        let err = net.train_one(&x, 10).unwrap_err();
        assert_eq!(
            err,
            NetworkError::InvalidLabel {
                label: 10,
                num_classes: 10
            }
        );
    }

    #[test]
    fn test_uniform_logits_loss_is_ln_num_classes() {
        // A dense layer with zero weights and biases produces uniform logits,
        // so the cross-entropy loss must be ln(10).
        let mut rng = SimpleRng::new(1);
        let mut dense = DenseLayer::new(4, 10, &mut rng);
        dense.weights_mut().fill(0.0);
        let mut net = Network::from_layers(vec![Box::new(dense)], 10, 0.01);

        let loss = net
            .train_one(&Tensor::vector(vec![0.5, -0.5, 1.0, 2.0]), 0)
            .unwrap();
        assert_relative_eq!(loss, 10.0f32.ln(), epsilon = 1e-5);
    }

    #[test]
    fn test_apply_without_training_is_noop() {
        let mut rng = SimpleRng::new(11);
        let mut net = Network::cnn(0.5, &mut rng);
        let x = sample(&mut rng);

        let before = net.forward(&x).unwrap();
        net.apply_gradients(3);
        let after = net.forward(&x).unwrap();

        assert_eq!(before.as_slice(), after.as_slice());
    }
}
