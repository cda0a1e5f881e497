// optim.rs
// Gradient-based parameter updates. Optimizers read gradients accumulated by
// `Graph::propagate_back` and write new values through `Graph::set_value`,
// which only accepts trainable leaves.

use std::collections::HashMap;

use log::debug;

use crate::error::{GradnetError, Result};
use crate::graph::{Graph, NodeId};

pub trait Optimizer {
    /// Applies one update to every listed parameter, using the gradients
    /// currently stored in the graph.
    fn step(&mut self, graph: &mut Graph, params: &[NodeId]) -> Result<()>;
}

/// Adam with decoupled first and second moment estimates per scalar.
///
/// The step counter `t` is global: it advances once per `step` call and every
/// parameter shares the same bias-correction exponent, no matter how the
/// caller groups parameters into layers.
pub struct Adam {
    lr: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    t: u64,
    m: HashMap<NodeId, f64>,
    v: HashMap<NodeId, f64>,
}

impl Adam {
    pub fn new(lr: f64, beta1: f64, beta2: f64, eps: f64) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            eps,
            t: 0,
            m: HashMap::new(),
            v: HashMap::new(),
        }
    }

    /// Standard hyperparameters: beta1 = 0.9, beta2 = 0.999, eps = 1e-8.
    pub fn with_defaults(lr: f64) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-8)
    }

    pub fn timestep(&self) -> u64 {
        self.t
    }
}

impl Optimizer for Adam {
    fn step(&mut self, graph: &mut Graph, params: &[NodeId]) -> Result<()> {
        self.t += 1;
        let correction1 = 1.0 - self.beta1.powi(self.t as i32);
        let correction2 = 1.0 - self.beta2.powi(self.t as i32);

        for &id in params {
            if !graph.is_trainable(id)? {
                return Err(GradnetError::InvalidState(format!(
                    "optimizer given non-trainable node {id}"
                )));
            }
            let grad = graph.grad(id)?;

            let m = self.m.entry(id).or_insert(0.0);
            *m = self.beta1 * *m + (1.0 - self.beta1) * grad;
            let v = self.v.entry(id).or_insert(0.0);
            *v = self.beta2 * *v + (1.0 - self.beta2) * grad * grad;

            let m_hat = *m / correction1;
            let v_hat = *v / correction2;

            let value = graph.value(id)?;
            graph.set_value(id, value - self.lr * m_hat / (v_hat.sqrt() + self.eps))?;
        }
        debug!("adam step t = {} over {} parameters", self.t, params.len());
        Ok(())
    }
}
