//! Simple random number generator for reproducibility.
//!
//! A lightweight xorshift-based PRNG. One generator is seeded once and
//! threaded by mutable reference through layer initialization and epoch
//! shuffling, so a single seed fixes an entire training run.

/// Seedable xorshift RNG.
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    /// Create a new RNG with explicit seed (if zero, use a fixed value).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 0x9e3779b97f4a7c15 } else { seed };
        Self { state }
    }

    /// Basic xorshift to generate u32.
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x >> 32) as u32
    }

    /// Convert to [0, 1).
    pub fn next_f32(&mut self) -> f32 {
        self.next_u32() as f32 / (u32::MAX as f32 + 1.0)
    }

    /// Uniform sample in [low, high).
    pub fn gen_range_f32(&mut self, low: f32, high: f32) -> f32 {
        low + (high - low) * self.next_f32()
    }

    /// Integer sample in [0, upper).
    pub fn gen_usize(&mut self, upper: usize) -> usize {
        if upper == 0 {
            0
        } else {
            (self.next_u32() as usize) % upper
        }
    }

    /// Fisher-Yates shuffle for usize slices.
    pub fn shuffle_usize(&mut self, data: &mut [usize]) {
        if data.len() <= 1 {
            return;
        }
        for i in (1..data.len()).rev() {
            let j = self.gen_usize(i + 1);
            data.swap(i, j);
        }
    }
}
