// activations.rs
// Per-layer nonlinearity selection. `Identity` is the no-op used by output
// layers of regression models; it allocates nothing.

use crate::error::Result;
use crate::graph::Graph;
use crate::tensor::{MapOp, Tensor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activation {
    #[default]
    Identity,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    /// Applies the nonlinearity cell-by-cell, returning the input tensor
    /// unchanged for `Identity`.
    pub fn apply(&self, input: &Tensor, graph: &mut Graph) -> Result<Tensor> {
        match self {
            Activation::Identity => Ok(input.clone()),
            Activation::Relu => input.map(MapOp::Relu, graph),
            Activation::Sigmoid => input.map(MapOp::Sigmoid, graph),
            Activation::Tanh => input.map(MapOp::Tanh, graph),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Activation::Identity => "identity",
            Activation::Relu => "relu",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
        }
    }
}
