// layers.rs
// Fully connected layer over the scalar graph. Weights are an
// (out_features x in_features) tensor of trainable leaves, biases an
// (out_features x 1) column. Forward allocates the whole affine expression
// as graph nodes, so gradients flow back to every parameter.

use log::debug;

use crate::error::{GradnetError, Result};
use crate::graph::{Graph, NodeId};
use crate::initializers::{sample_vec, xavier_uniform};
use crate::nn::activations::Activation;
use crate::tensor::Tensor;

pub struct FeedForwardLayer {
    weights: Tensor,
    biases: Tensor,
    activation: Activation,
    in_features: usize,
    out_features: usize,
}

impl FeedForwardLayer {
    /// New layer with Xavier-uniform weights and zero biases.
    ///
    /// Allocates trainable leaves, so like [`Graph::leaf`] this is only valid
    /// while the graph holds no ephemeral nodes.
    pub fn new(
        graph: &mut Graph,
        out_features: usize,
        in_features: usize,
        activation: Activation,
    ) -> Result<Self> {
        let init = xavier_uniform(in_features, out_features, 1.0);
        let weights = sample_vec(init, out_features * in_features);
        Self::with_parameters(
            graph,
            weights,
            vec![0.0; out_features],
            out_features,
            in_features,
            activation,
        )
    }

    /// New layer from explicit weight and bias values, row-major.
    pub fn with_parameters(
        graph: &mut Graph,
        weights: Vec<f64>,
        biases: Vec<f64>,
        out_features: usize,
        in_features: usize,
        activation: Activation,
    ) -> Result<Self> {
        let weights =
            Tensor::from_vec_trainable(graph, weights, out_features, in_features)?;
        let biases = Tensor::from_vec_trainable(graph, biases, out_features, 1)?;
        debug!(
            "feedforward layer {out_features}x{in_features}, activation {}",
            activation.name()
        );
        Ok(Self {
            weights,
            biases,
            activation,
            in_features,
            out_features,
        })
    }

    /// activation(W . x + b). The input is a column block of shape
    /// (in_features x batch); the bias column is added to every batch column.
    pub fn forward(&self, input: &Tensor, graph: &mut Graph) -> Result<Tensor> {
        if input.rows() != self.in_features {
            return Err(GradnetError::ShapeMismatch {
                operation: "layer forward",
                expected: (self.in_features, input.cols()),
                actual: input.shape(),
            });
        }
        let z = self.weights.dot(input, graph)?;
        let mut biased = Vec::with_capacity(z.rows() * z.cols());
        for i in 0..z.rows() {
            for j in 0..z.cols() {
                biased.push(graph.add(&[z.node(i, j), self.biases.node(i, 0)])?);
            }
        }
        let z = Tensor::from_node_ids(biased, (z.rows(), z.cols()))?;
        self.activation.apply(&z, graph)
    }

    /// Parameter handles in a stable order: weights row-major, then biases.
    pub fn parameters(&self) -> Vec<NodeId> {
        let mut params = self.weights.node_ids();
        params.extend(self.biases.node_ids());
        params
    }

    pub fn num_params(&self) -> usize {
        self.out_features * self.in_features + self.out_features
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn weights(&self) -> &Tensor {
        &self.weights
    }

    pub fn biases(&self) -> &Tensor {
        &self.biases
    }
}
