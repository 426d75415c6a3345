//! Flat f32 tensor with explicit shape metadata
//!
//! Layers operate on flat buffers in row-major order; the shape travels with
//! the data so that dimension mismatches can be detected instead of relying
//! on caller discipline. A shape is either `[n]` for a plain vector or
//! `[c, h, w]` for a channel-major activation map.

use crate::utils::SimpleRng;
use std::ops::{Index, IndexMut};

/// Ordered sequence of f32 values plus the shape it is laid out in.
///
/// No tensor outlives the call that produces it except layer-held state
/// (parameters and forward caches), so cloning is rare and cheap enough.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: Vec<f32>,
    shape: Vec<usize>,
}

impl Tensor {
    /// Create a tensor filled with zeros.
    pub fn zeros(shape: &[usize]) -> Self {
        let len = shape.iter().product();
        Self {
            data: vec![0.0f32; len],
            shape: shape.to_vec(),
        }
    }

    /// Wrap existing data in a tensor.
    ///
    /// # Panics
    ///
    /// Panics if the data length does not match the product of the shape.
    pub fn from_vec(data: Vec<f32>, shape: &[usize]) -> Self {
        let expected: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            expected,
            "data length {} does not match shape {:?}",
            data.len(),
            shape
        );
        Self {
            data,
            shape: shape.to_vec(),
        }
    }

    /// Wrap existing data as a 1-D vector tensor.
    pub fn vector(data: Vec<f32>) -> Self {
        let len = data.len();
        Self {
            data,
            shape: vec![len],
        }
    }

    /// Create a tensor with values sampled uniformly from `[low, high)`.
    ///
    /// The generator is threaded by reference so that layer initialization
    /// order is part of the determinism contract: the same seed always
    /// produces the same parameters.
    pub fn random_uniform(shape: &[usize], low: f32, high: f32, rng: &mut SimpleRng) -> Self {
        let len: usize = shape.iter().product();
        let mut data = vec![0.0f32; len];
        for value in &mut data {
            *value = rng.gen_range_f32(low, high);
        }
        Self {
            data,
            shape: shape.to_vec(),
        }
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Shape of the tensor (`[n]` or `[c, h, w]`).
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Index of the maximum element; ties resolve to the first occurrence.
    ///
    /// # Panics
    ///
    /// Panics if the tensor is empty.
    pub fn argmax(&self) -> usize {
        assert!(!self.data.is_empty(), "argmax of empty tensor");
        let mut best = self.data[0];
        let mut arg = 0usize;
        for (i, &value) in self.data.iter().enumerate().skip(1) {
            if value > best {
                best = value;
                arg = i;
            }
        }
        arg
    }
}

impl Index<usize> for Tensor {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.data[index]
    }
}

impl IndexMut<usize> for Tensor {
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        &mut self.data[index]
    }
}
