//! 2x2 max-pooling layer, stride 2, no overlap.

use crate::error::NetworkError;
use crate::layers::r#trait::check_input;
use crate::layers::Layer;
use crate::tensor::Tensor;

const POOL: usize = 2;

/// 2x2 max-pool over a `C x H x W` activation map, producing `C x H/2 x W/2`.
///
/// For each output cell the layer records the flat input index of the window
/// maximum (ties broken by row-major scan order: the first maximum wins) and
/// routes the whole output gradient there during backward.
pub struct MaxPoolLayer {
    channels: usize,
    input_height: usize,
    input_width: usize,
    /// Flat input index of the winner per output cell, from the last forward.
    argmax: Option<Vec<usize>>,
}

impl MaxPoolLayer {
    /// # Panics
    ///
    /// Panics if `height` or `width` is not divisible by 2 (windows never
    /// overlap and never run past the edge).
    pub fn new(channels: usize, input_height: usize, input_width: usize) -> Self {
        assert!(
            input_height % POOL == 0 && input_width % POOL == 0,
            "maxpool input {}x{} must be divisible by {}",
            input_height,
            input_width,
            POOL
        );
        Self {
            channels,
            input_height,
            input_width,
            argmax: None,
        }
    }

    fn output_height(&self) -> usize {
        self.input_height / POOL
    }

    fn output_width(&self) -> usize {
        self.input_width / POOL
    }
}

impl Layer for MaxPoolLayer {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, NetworkError> {
        check_input(self.name(), self.input_size(), input)?;

        let out_h = self.output_height();
        let out_w = self.output_width();
        let in_spatial = self.input_height * self.input_width;
        let out_spatial = out_h * out_w;

        let mut output = Tensor::zeros(&[self.channels, out_h, out_w]);
        let mut argmax = vec![0usize; self.channels * out_spatial];

        for c in 0..self.channels {
            let in_base = c * in_spatial;
            let out_base = c * out_spatial;

            for py in 0..out_h {
                for px in 0..out_w {
                    let mut best = f32::NEG_INFINITY;
                    let mut best_i = 0usize;

                    // 2x2 window scan; strict > keeps the first maximum.
                    for dy in 0..POOL {
                        for dx in 0..POOL {
                            let iy = py * POOL + dy;
                            let ix = px * POOL + dx;
                            let i = in_base + iy * self.input_width + ix;
                            if input[i] > best {
                                best = input[i];
                                best_i = i;
                            }
                        }
                    }

                    let out_i = out_base + py * out_w + px;
                    output[out_i] = best;
                    argmax[out_i] = best_i;
                }
            }
        }

        self.argmax = Some(argmax);
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, NetworkError> {
        let argmax = self
            .argmax
            .take()
            .ok_or(NetworkError::NoCachedInput { layer: self.name() })?;
        check_input(self.name(), self.output_size(), grad_output)?;

        // Fresh zeroed buffer; every non-winning input position stays at zero.
        let mut grad_input = Tensor::zeros(&[self.channels, self.input_height, self.input_width]);
        for (out_i, &in_i) in argmax.iter().enumerate() {
            grad_input[in_i] = grad_output[out_i];
        }
        Ok(grad_input)
    }

    fn apply_gradients(&mut self, _batch_size: usize, _learning_rate: f32) {}

    fn input_size(&self) -> usize {
        self.channels * self.input_height * self.input_width
    }

    fn output_size(&self) -> usize {
        self.channels * self.output_height() * self.output_width()
    }

    fn parameter_count(&self) -> usize {
        0
    }

    fn name(&self) -> &'static str {
        "maxpool2x2"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maxpool_forward_single_window() {
        let mut layer = MaxPoolLayer::new(1, 2, 2);
        let out = layer
            .forward(&Tensor::from_vec(vec![1.0, 3.0, 2.0, 4.0], &[1, 2, 2]))
            .unwrap();
        assert_eq!(out.as_slice(), &[4.0]);
        assert_eq!(out.shape(), &[1, 1, 1]);
    }

    #[test]
    fn test_maxpool_backward_routes_to_argmax() {
        let mut layer = MaxPoolLayer::new(1, 2, 2);
        layer
            .forward(&Tensor::from_vec(vec![1.0, 3.0, 2.0, 4.0], &[1, 2, 2]))
            .unwrap();
        let dx = layer.backward(&Tensor::vector(vec![5.0])).unwrap();
        assert_eq!(dx.as_slice(), &[0.0, 0.0, 0.0, 5.0]);
    }

    #[test]
    fn test_maxpool_first_maximum_wins_ties() {
        let mut layer = MaxPoolLayer::new(1, 2, 2);
        layer
            .forward(&Tensor::from_vec(vec![7.0, 7.0, 7.0, 7.0], &[1, 2, 2]))
            .unwrap();
        let dx = layer.backward(&Tensor::vector(vec![1.0])).unwrap();
        assert_eq!(dx.as_slice(), &[1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_maxpool_multi_channel() {
        let mut layer = MaxPoolLayer::new(2, 2, 2);
        let input = Tensor::from_vec(
            vec![1.0, 2.0, 3.0, 4.0, 8.0, 7.0, 6.0, 5.0],
            &[2, 2, 2],
        );
        let out = layer.forward(&input).unwrap();
        assert_eq!(out.as_slice(), &[4.0, 8.0]);

        let dx = layer.backward(&Tensor::vector(vec![1.0, 2.0])).unwrap();
        assert_eq!(dx.as_slice(), &[0.0, 0.0, 0.0, 1.0, 2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_maxpool_backward_without_forward_errors() {
        let mut layer = MaxPoolLayer::new(1, 2, 2);
        assert!(layer.backward(&Tensor::vector(vec![1.0])).is_err());
    }

    #[test]
    #[should_panic(expected = "divisible")]
    fn test_maxpool_odd_input_panics() {
        MaxPoolLayer::new(1, 3, 4);
    }
}
