// model.rs
// Sequential container: layers applied in insertion order, the output of one
// feeding the next.

use crate::error::{GradnetError, Result};
use crate::graph::{Graph, NodeId};
use crate::nn::layers::FeedForwardLayer;
use crate::tensor::Tensor;

#[derive(Default)]
pub struct Sequential {
    layers: Vec<FeedForwardLayer>,
}

impl Sequential {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Appends a layer. Adjacent layers must agree on width so that forward
    /// can chain them without reshaping.
    pub fn add_layer(&mut self, layer: FeedForwardLayer) -> Result<()> {
        if let Some(last) = self.layers.last() {
            if last.out_features() != layer.in_features() {
                return Err(GradnetError::ShapeMismatch {
                    operation: "add_layer",
                    expected: (last.out_features(), 1),
                    actual: (layer.in_features(), 1),
                });
            }
        }
        self.layers.push(layer);
        Ok(())
    }

    pub fn forward(&self, input: &Tensor, graph: &mut Graph) -> Result<Tensor> {
        let mut current = input.clone();
        for layer in &self.layers {
            current = layer.forward(&current, graph)?;
        }
        Ok(current)
    }

    /// All parameter handles, layer by layer in insertion order.
    pub fn parameters(&self) -> Vec<NodeId> {
        self.layers.iter().flat_map(|l| l.parameters()).collect()
    }

    pub fn num_params(&self) -> usize {
        self.layers.iter().map(|l| l.num_params()).sum()
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[FeedForwardLayer] {
        &self.layers
    }
}
