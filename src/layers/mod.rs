//! Layer abstractions for the training engine
//!
//! This module provides the Layer trait and the closed set of layer types the
//! fixed pipelines are built from: Dense, Conv2D, ReLU and 2x2 MaxPool.

mod r#trait;
pub mod conv2d;
pub mod dense;
pub mod maxpool;
pub mod relu;

// Re-export the Layer trait and implementations for convenience
pub use conv2d::Conv2DLayer;
pub use dense::DenseLayer;
pub use maxpool::MaxPoolLayer;
pub use r#trait::Layer;
pub use relu::ReluLayer;
