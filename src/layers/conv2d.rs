//! 2D convolutional layer implementation
//!
//! Stride-1 square-kernel convolution with implicit zero padding:
//! out-of-range taps contribute nothing, which is equivalent to padding the
//! input with zeros. With `kernel_size = 3` and `padding = 1` the spatial
//! dimensions are preserved, which is how the convolutional pipeline uses it.

use crate::error::NetworkError;
use crate::layers::r#trait::check_input;
use crate::layers::Layer;
use crate::tensor::Tensor;
use crate::utils::SimpleRng;
use rayon::prelude::*;

/// 2D convolutional layer with learnable filters (stride 1).
///
/// Filters are stored flat as `out_channels x in_channels x k x k`, indexed
/// `weights[((oc * in_channels + ic) * k + ky) * k + kx]`, with one bias per
/// output channel.
///
/// This is the most compute-intensive operation in the engine,
/// `O(outC * inC * H^2 * k^2)` per sample. The forward pass is parallelized
/// over output channels: every task writes its own disjoint output plane, so
/// the result is identical to the sequential one. The backward pass
/// scatter-adds into shared `dx`/`dW` buffers and stays sequential.
///
/// Gradient storage follows the same protocol as [`DenseLayer`]:
/// instantaneous `grad_*` buffers recomputed per backward call, persistent
/// `acc_*` accumulators zeroed only by `apply_gradients`.
///
/// [`DenseLayer`]: crate::layers::DenseLayer
pub struct Conv2DLayer {
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    padding: usize,
    input_height: usize,
    input_width: usize,
    weights: Vec<f32>,
    biases: Vec<f32>,
    grad_weights: Vec<f32>,
    grad_biases: Vec<f32>,
    acc_weights: Vec<f32>,
    acc_biases: Vec<f32>,
    cache: Option<Tensor>,
}

impl Conv2DLayer {
    /// Create a new Conv2DLayer.
    ///
    /// Filter weights are sampled uniformly from `[-0.05, 0.05)` using the
    /// shared generator; biases start at zero.
    ///
    /// # Panics
    ///
    /// Panics if the kernel plus padding would produce an empty output.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        padding: usize,
        input_height: usize,
        input_width: usize,
        rng: &mut SimpleRng,
    ) -> Self {
        assert!(
            input_height + 2 * padding >= kernel_size && input_width + 2 * padding >= kernel_size,
            "conv2d kernel {} too large for {}x{} input with padding {}",
            kernel_size,
            input_height,
            input_width,
            padding
        );

        let weight_count = out_channels * in_channels * kernel_size * kernel_size;
        let mut weights = vec![0.0f32; weight_count];
        for value in &mut weights {
            *value = rng.gen_range_f32(-0.05, 0.05);
        }

        Self {
            in_channels,
            out_channels,
            kernel_size,
            padding,
            input_height,
            input_width,
            weights,
            biases: vec![0.0f32; out_channels],
            grad_weights: vec![0.0f32; weight_count],
            grad_biases: vec![0.0f32; out_channels],
            acc_weights: vec![0.0f32; weight_count],
            acc_biases: vec![0.0f32; out_channels],
            cache: None,
        }
    }

    /// Output height: `input_height + 2 * padding - kernel_size + 1`.
    pub fn output_height(&self) -> usize {
        self.input_height + 2 * self.padding - self.kernel_size + 1
    }

    /// Output width: `input_width + 2 * padding - kernel_size + 1`.
    pub fn output_width(&self) -> usize {
        self.input_width + 2 * self.padding - self.kernel_size + 1
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Filter weights, `weights[((oc * inC + ic) * k + ky) * k + kx]`.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Mutable filter access, used by gradient-checking tests.
    pub fn weights_mut(&mut self) -> &mut [f32] {
        &mut self.weights
    }

    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    pub fn biases_mut(&mut self) -> &mut [f32] {
        &mut self.biases
    }

    /// Accumulated filter gradients for the current mini-batch.
    pub fn accumulated_weight_grads(&self) -> &[f32] {
        &self.acc_weights
    }

    /// Accumulated bias gradients for the current mini-batch.
    pub fn accumulated_bias_grads(&self) -> &[f32] {
        &self.acc_biases
    }
}

impl Layer for Conv2DLayer {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, NetworkError> {
        check_input(self.name(), self.input_size(), input)?;

        let out_h = self.output_height();
        let out_w = self.output_width();
        let out_spatial = out_h * out_w;
        let in_spatial = self.input_height * self.input_width;
        let k = self.kernel_size;
        let pad = self.padding as isize;

        let mut output = Tensor::zeros(&[self.out_channels, out_h, out_w]);

        {
            let weights = &self.weights;
            let biases = &self.biases;
            let in_data = input.as_slice();
            let in_channels = self.in_channels;
            let input_height = self.input_height as isize;
            let input_width = self.input_width as isize;

            // Each output channel is an independent plane; one task per
            // channel writes a disjoint slice, so the parallel result is
            // bit-identical to the sequential one.
            output
                .as_mut_slice()
                .par_chunks_mut(out_spatial)
                .enumerate()
                .for_each(|(oc, plane)| {
                    let bias = biases[oc];
                    for oy in 0..out_h {
                        for ox in 0..out_w {
                            let mut sum = bias;
                            for ic in 0..in_channels {
                                let w_base = (oc * in_channels + ic) * k * k;
                                let in_base = ic * in_spatial;
                                for ky in 0..k {
                                    let iy = (oy + ky) as isize - pad;
                                    if iy < 0 || iy >= input_height {
                                        continue;
                                    }
                                    for kx in 0..k {
                                        let ix = (ox + kx) as isize - pad;
                                        if ix < 0 || ix >= input_width {
                                            continue;
                                        }
                                        let in_idx = in_base
                                            + iy as usize * input_width as usize
                                            + ix as usize;
                                        sum += in_data[in_idx] * weights[w_base + ky * k + kx];
                                    }
                                }
                            }
                            plane[oy * out_w + ox] = sum;
                        }
                    }
                });
        }

        self.cache = Some(input.clone());
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NetworkError> {
        let cache = self
            .cache
            .take()
            .ok_or(NetworkError::NoCachedInput { layer: self.name() })?;
        check_input(self.name(), self.output_size(), grad_output)?;

        let out_h = self.output_height();
        let out_w = self.output_width();
        let out_spatial = out_h * out_w;
        let in_spatial = self.input_height * self.input_width;
        let k = self.kernel_size;
        let pad = self.padding as isize;

        self.grad_weights.fill(0.0);
        self.grad_biases.fill(0.0);
        // Additive scatter: each input position collects contributions from
        // every overlapping output window, so dx starts from zero.
        let mut grad_input =
            Tensor::zeros(&[self.in_channels, self.input_height, self.input_width]);

        for oc in 0..self.out_channels {
            let g_base = oc * out_spatial;
            for oy in 0..out_h {
                for ox in 0..out_w {
                    let g = grad_output[g_base + oy * out_w + ox];
                    self.grad_biases[oc] += g;

                    for ic in 0..self.in_channels {
                        let w_base = (oc * self.in_channels + ic) * k * k;
                        let in_base = ic * in_spatial;
                        for ky in 0..k {
                            let iy = (oy + ky) as isize - pad;
                            if iy < 0 || iy >= self.input_height as isize {
                                continue;
                            }
                            for kx in 0..k {
                                let ix = (ox + kx) as isize - pad;
                                if ix < 0 || ix >= self.input_width as isize {
                                    continue;
                                }
                                let in_idx =
                                    in_base + iy as usize * self.input_width + ix as usize;
                                let w_idx = w_base + ky * k + kx;
                                self.grad_weights[w_idx] += cache[in_idx] * g;
                                grad_input[in_idx] += self.weights[w_idx] * g;
                            }
                        }
                    }
                }
            }
        }

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
        self.in_channels * self.input_height * self.input_width
    }

    fn output_size(&self) -> usize {
        self.out_channels * self.output_height() * self.output_width()
    }

    fn parameter_count(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    fn name(&self) -> &'static str {
        "conv2d"
    }
}
