//! # Gradnet
//!
//! Gradnet is a lightweight, CPU-based reverse-mode automatic differentiation
//! engine written in Rust, built around a dynamic graph of scalar nodes.
//!
//! ## Features
//!
//! - Reverse-mode automatic differentiation (backpropagation)
//! - Dynamic per-step computation graph with an explicit
//!   build / propagate_back / prune lifecycle
//! - 2-D tensors of node handles via `ndarray`, with matrix product and
//!   elementwise maps that wire straight into the graph
//! - High-level neural network modules: feedforward layers, a sequential
//!   container, L1/L2 losses and an Adam optimizer
//! - Written 100% in safe Rust
//!
pub mod error;
pub mod graph;
pub mod initializers;
pub mod nn;
pub mod optim;
pub mod tensor;

// Re-export commonly used types for convenience
pub use error::{GradnetError, Result};
pub use graph::{Graph, Node, NodeId, OpKind};
pub use nn::{l1_loss, l2_loss, Activation, FeedForwardLayer, Sequential};
pub use optim::{Adam, Optimizer};
pub use tensor::{MapOp, Tensor};
