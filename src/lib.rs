//! Hand-written neural-network training engine
//!
//! This library implements a small set of layer primitives (dense, 2-D
//! convolution, ReLU, 2x2 max-pooling) composed into fixed-topology networks,
//! trained by manual backpropagation and plain SGD. There is no computation
//! graph and no autodiff: every layer implements its own forward pass,
//! backward pass, and gradient accumulation, and the network chains them in a
//! declared order.
//!
//! # Modules
//!
//! - `tensor`: flat f32 tensor with explicit shape metadata
//! - `layers`: Layer trait and implementations (Dense, Conv2D, ReLU, MaxPool)
//! - `network`: fixed pipelines, softmax cross-entropy loss, training steps
//! - `data`: MNIST IDX file loader
//! - `training`: epoch/shuffle driver and reporting
//! - `config`: training configuration (JSON)
//! - `utils`: seedable RNG and activation helpers
//! - `error`: typed error enums

pub mod config;
pub mod data;
pub mod error;
pub mod layers;
pub mod network;
pub mod tensor;
pub mod training;
pub mod utils;
