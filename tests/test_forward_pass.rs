// Tests for forward propagation: output dimensions and known-value checks
// through individual layers and the two full pipelines.

use approx::assert_relative_eq;
use mnist_backprop::layers::{Conv2DLayer, DenseLayer, Layer, MaxPoolLayer, ReluLayer};
use mnist_backprop::network::Network;
use mnist_backprop::tensor::Tensor;
use mnist_backprop::utils::SimpleRng;

#[test]
fn test_mlp_pipeline_shapes() {
    let mut rng = SimpleRng::new(42);
    let mut net = Network::mlp(0.01, &mut rng);
    let input = Tensor::random_uniform(&[784], 0.0, 1.0, &mut rng);

    let logits = net.forward(&input).unwrap();
    assert_eq!(logits.len(), 10);
    assert!(logits.as_slice().iter().all(|v| v.is_finite()));
}

#[test]
fn test_cnn_pipeline_shapes() {
    let mut rng = SimpleRng::new(42);
    let mut conv = Conv2DLayer::new(1, 8, 3, 1, 28, 28, &mut rng);
    let mut relu = ReluLayer::new(8 * 28 * 28);
    let mut pool = MaxPoolLayer::new(8, 28, 28);
    let mut dense = DenseLayer::new(8 * 14 * 14, 10, &mut rng);

    let input = Tensor::random_uniform(&[1, 28, 28], 0.0, 1.0, &mut rng);
    let a = conv.forward(&input).unwrap();
    assert_eq!(a.shape(), &[8, 28, 28]);

    let b = relu.forward(&a).unwrap();
    assert_eq!(b.len(), 8 * 28 * 28);
    assert!(b.as_slice().iter().all(|&v| v >= 0.0));

    let c = pool.forward(&b).unwrap();
    assert_eq!(c.shape(), &[8, 14, 14]);

    let logits = dense.forward(&c).unwrap();
    assert_eq!(logits.len(), 10);
}

#[test]
fn test_dense_forward_known_values() {
    // y[o] = b[o] + sum_i x[i] * W[o * in + i]
    let mut rng = SimpleRng::new(1);
    let mut layer = DenseLayer::new(3, 2, &mut rng);
    layer
        .weights_mut()
        .copy_from_slice(&[0.5, -1.0, 2.0, 1.0, 1.0, 1.0]);
    layer.biases_mut().copy_from_slice(&[1.0, -1.0]);

    let out = layer
        .forward(&Tensor::vector(vec![2.0, 1.0, 0.5]))
        .unwrap();
    assert_relative_eq!(out[0], 1.0 + 0.5 * 2.0 - 1.0 + 2.0 * 0.5);
    assert_relative_eq!(out[1], -1.0 + 2.0 + 1.0 + 0.5);
}

#[test]
fn test_conv_padding_preserves_spatial_size() {
    let mut rng = SimpleRng::new(5);
    let mut conv = Conv2DLayer::new(1, 4, 3, 1, 28, 28, &mut rng);
    let input = Tensor::random_uniform(&[1, 28, 28], 0.0, 1.0, &mut rng);

    let out = conv.forward(&input).unwrap();
    assert_eq!(out.shape(), &[4, 28, 28]);
}

#[test]
fn test_forward_is_deterministic() {
    let mut rng = SimpleRng::new(9);
    let mut net = Network::cnn(0.01, &mut rng);
    let input = Tensor::random_uniform(&[1, 28, 28], 0.0, 1.0, &mut rng);

    // Parallel conv forward must be bitwise reproducible run to run.
    let first = net.forward(&input).unwrap();
    let second = net.forward(&input).unwrap();
    assert_eq!(first.as_slice(), second.as_slice());
}
