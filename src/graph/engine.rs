// engine.rs
// Arena-backed computation graph with an explicit per-step lifecycle:
// unbuilt -> build(head) -> propagate_back(head) -> prune() -> unbuilt.
//
// All nodes live in one contiguous vector and are addressed by index.
// Trainable parameters are allocated first and occupy the prefix
// `nodes[..trainable_len]`; everything a forward pass creates lands past that
// watermark, so "trainable vs ephemeral" is a property of the index range and
// pruning is a truncate instead of per-node free bookkeeping.

use log::{debug, trace};

use super::node::{Node, NodeId, OpKind};
use crate::error::{GradnetError, Result};

/// Lifecycle of the current training step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GraphState {
    Unbuilt,
    Built,
    Propagated,
}

/// Dynamic computation graph over scalar [`Node`]s.
///
/// The graph is rebuilt every training step: parent edges change with each
/// forward pass, so `build` rediscovers the subgraph reachable from the loss
/// head before `propagate_back` runs the chain rule over it in dependency
/// order. `prune` then frees everything except the trainable parameters and
/// readies the graph for the next step.
#[derive(Debug)]
pub struct Graph {
    nodes: Vec<Node>,
    /// Nodes below this index are trainable parameters and survive pruning.
    trainable_len: usize,
    head: Option<NodeId>,
    /// Nodes reachable from `head` via parent edges, each exactly once.
    registry: Vec<NodeId>,
    state: GraphState,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            trainable_len: 0,
            head: None,
            registry: Vec::new(),
            state: GraphState::Unbuilt,
        }
    }

    // ---------------------------------------------------------------------
    // Node construction
    // ---------------------------------------------------------------------

    /// Creates a leaf node: a trainable parameter or a constant.
    ///
    /// Trainable leaves must keep the arena prefix contiguous, so they can
    /// only be created while no ephemeral nodes exist — at model construction
    /// time or right after a `prune`.
    pub fn leaf(&mut self, value: f64, trainable: bool) -> Result<NodeId> {
        if trainable && self.nodes.len() != self.trainable_len {
            return Err(GradnetError::InvalidState(format!(
                "cannot create a trainable leaf while {} ephemeral nodes exist; \
                 parameters must be allocated before any forward pass",
                self.num_ephemeral()
            )));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::leaf(value, trainable));
        if trainable {
            self.trainable_len += 1;
        }
        Ok(id)
    }

    /// Ephemeral constant leaf. Never fails: constants are always appended
    /// past the trainable watermark.
    pub fn constant(&mut self, value: f64) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::leaf(value, false));
        id
    }

    /// N-ary sum over one or more operands.
    pub fn add(&mut self, operands: &[NodeId]) -> Result<NodeId> {
        if operands.is_empty() {
            return Err(GradnetError::InvalidState(
                "add expects at least one operand".to_string(),
            ));
        }
        self.apply_op(OpKind::Add, operands.to_vec())
    }

    /// Binary difference `a - b`.
    pub fn subtract(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        self.apply_op(OpKind::Subtract, vec![a, b])
    }

    /// N-ary product over two or more operands.
    pub fn multiply(&mut self, operands: &[NodeId]) -> Result<NodeId> {
        if operands.len() < 2 {
            return Err(GradnetError::InvalidState(
                "multiply expects at least two operands".to_string(),
            ));
        }
        self.apply_op(OpKind::Multiply, operands.to_vec())
    }

    pub fn sqrt(&mut self, x: NodeId) -> Result<NodeId> {
        self.apply_op(OpKind::Sqrt, vec![x])
    }

    pub fn exp(&mut self, x: NodeId) -> Result<NodeId> {
        self.apply_op(OpKind::Exp, vec![x])
    }

    pub fn log(&mut self, x: NodeId) -> Result<NodeId> {
        self.apply_op(OpKind::Log, vec![x])
    }

    pub fn sigmoid(&mut self, x: NodeId) -> Result<NodeId> {
        self.apply_op(OpKind::Sigmoid, vec![x])
    }

    pub fn tanh(&mut self, x: NodeId) -> Result<NodeId> {
        self.apply_op(OpKind::Tanh, vec![x])
    }

    pub fn relu(&mut self, x: NodeId) -> Result<NodeId> {
        self.apply_op(OpKind::Relu, vec![x])
    }

    /// Computes the op's forward value eagerly and appends a new ephemeral
    /// node whose parents are the operands.
    fn apply_op(&mut self, op: OpKind, parents: Vec<NodeId>) -> Result<NodeId> {
        if let Some(arity) = op.arity() {
            if parents.len() != arity {
                return Err(GradnetError::InvalidState(format!(
                    "{} expects {} operand(s), got {}",
                    op.name(),
                    arity,
                    parents.len()
                )));
            }
        }
        let mut parent_values = Vec::with_capacity(parents.len());
        for &p in &parents {
            parent_values.push(self.value(p)?);
        }
        let value = Self::forward_value(op, &parent_values)?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::from_op(value, op, parents));
        Ok(id)
    }

    /// Forward evaluation with eager domain checks; invalid inputs fail here
    /// instead of propagating NaNs through the graph.
    fn forward_value(op: OpKind, parent_values: &[f64]) -> Result<f64> {
        let value = match op {
            OpKind::Leaf => {
                return Err(GradnetError::InvalidState(
                    "leaf nodes are not produced by apply_op".to_string(),
                ))
            }
            OpKind::Add => parent_values.iter().sum(),
            OpKind::Subtract => {
                parent_values[0] - parent_values[1..].iter().sum::<f64>()
            }
            OpKind::Multiply => parent_values.iter().product(),
            OpKind::Sqrt => {
                let x = parent_values[0];
                if x < 0.0 {
                    return Err(GradnetError::DomainError {
                        op: "sqrt",
                        value: x,
                    });
                }
                x.sqrt()
            }
            OpKind::Exp => parent_values[0].exp(),
            OpKind::Log => {
                let x = parent_values[0];
                if x <= 0.0 {
                    return Err(GradnetError::DomainError { op: "log", value: x });
                }
                x.ln()
            }
            OpKind::Sigmoid => 1.0 / (1.0 + (-parent_values[0]).exp()),
            OpKind::Tanh => parent_values[0].tanh(),
            OpKind::Relu => parent_values[0].max(0.0),
        };
        Ok(value)
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    fn check_id(&self, id: NodeId) -> Result<()> {
        if id.0 >= self.nodes.len() {
            return Err(GradnetError::InvalidState(format!(
                "{id} does not exist (arena holds {} nodes); it may have been pruned",
                self.nodes.len()
            )));
        }
        Ok(())
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn value(&self, id: NodeId) -> Result<f64> {
        self.check_id(id)?;
        Ok(self.nodes[id.0].value)
    }

    pub fn grad(&self, id: NodeId) -> Result<f64> {
        self.check_id(id)?;
        Ok(self.nodes[id.0].grad)
    }

    pub fn is_trainable(&self, id: NodeId) -> Result<bool> {
        self.check_id(id)?;
        Ok(self.nodes[id.0].trainable)
    }

    /// In-place parameter update, reserved for optimizers. Rejects ephemeral
    /// nodes: those are owned by the current step's registry and must never
    /// be mutated from outside.
    pub fn set_value(&mut self, id: NodeId, value: f64) -> Result<()> {
        self.check_id(id)?;
        if !self.nodes[id.0].trainable {
            return Err(GradnetError::InvalidState(format!(
                "{id} is not a trainable parameter"
            )));
        }
        self.nodes[id.0].value = value;
        Ok(())
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_trainable(&self) -> usize {
        self.trainable_len
    }

    pub fn num_ephemeral(&self) -> usize {
        self.nodes.len() - self.trainable_len
    }

    /// Nodes reachable from the current head, valid between `build` and
    /// `prune`.
    pub fn registry(&self) -> &[NodeId] {
        &self.registry
    }

    pub fn head(&self) -> Option<NodeId> {
        self.head
    }

    // ---------------------------------------------------------------------
    // Lifecycle: build -> propagate_back -> prune
    // ---------------------------------------------------------------------

    /// Discovers the subgraph reachable from `head` and records it in the
    /// registry, each node exactly once.
    ///
    /// Visited flags are cleared for every node first so stale marks from a
    /// previous step cannot suppress the traversal.
    pub fn build(&mut self, head: NodeId) -> Result<()> {
        self.check_id(head)?;
        for node in &mut self.nodes {
            node.visited = false;
        }
        self.registry.clear();

        let mut stack = vec![head];
        while let Some(id) = stack.pop() {
            if self.nodes[id.0].visited {
                continue;
            }
            self.nodes[id.0].visited = true;
            self.registry.push(id);
            stack.extend(self.nodes[id.0].parents.iter().copied());
        }

        self.head = Some(head);
        self.state = GraphState::Built;
        debug!(
            "graph built: {} of {} nodes reachable from {head}",
            self.registry.len(),
            self.nodes.len()
        );
        Ok(())
    }

    /// Runs the backward pass from `head` over the built registry.
    ///
    /// Two explicit phases: first a full topological order over the reachable
    /// subgraph (a node is placed strictly after every node that consumes
    /// it), then a linear walk invoking each node's backward rule in that
    /// order. Firing backward on first visit during the traversal itself
    /// would read gradients before all children have contributed and silently
    /// drop contributions for any node with more than one consumer.
    pub fn propagate_back(&mut self, head: NodeId) -> Result<()> {
        if self.state != GraphState::Built || self.head != Some(head) {
            return Err(GradnetError::InvalidState(format!(
                "propagate_back({head}) requires a graph built from the same head \
                 (current head: {:?})",
                self.head
            )));
        }

        let order = self.topological_order(head)?;
        for (position, &id) in order.iter().enumerate() {
            self.nodes[id.0].topo_index = position;
        }

        // Seed the head and walk children-before-parents.
        self.nodes[head.0].grad = 1.0;
        for &id in &order {
            let (value, grad, op, parents) = {
                let node = &self.nodes[id.0];
                (node.value, node.grad, node.op, node.parents.clone())
            };
            if parents.is_empty() {
                continue;
            }
            let parent_values: Vec<f64> =
                parents.iter().map(|&p| self.nodes[p.0].value).collect();
            let contributions = op.parent_contributions(value, grad, &parent_values);
            for (&parent, contribution) in parents.iter().zip(contributions) {
                self.nodes[parent.0].grad += contribution;
            }
            trace!("backward {} ({}): grad {grad}", id, op.name());
        }

        self.state = GraphState::Propagated;
        debug!("backward pass complete over {} nodes", order.len());
        Ok(())
    }

    /// Depth-first topological sort over parent edges, head first.
    ///
    /// Three-color marking: a grey node reached again means a parent chain
    /// loops back into itself. The graph is a DAG by construction, so a cycle
    /// is a caller-side wiring bug and fails fatally.
    fn topological_order(&self, head: NodeId) -> Result<Vec<NodeId>> {
        const WHITE: u8 = 0;
        const GREY: u8 = 1;
        const BLACK: u8 = 2;

        let mut color = vec![WHITE; self.nodes.len()];
        let mut post_order = Vec::with_capacity(self.registry.len());
        // (node, index of the next parent to visit)
        let mut stack: Vec<(NodeId, usize)> = vec![(head, 0)];
        color[head.0] = GREY;

        while let Some(frame) = stack.last_mut() {
            let (id, next) = *frame;
            let parents = &self.nodes[id.0].parents;
            if next < parents.len() {
                frame.1 += 1;
                let parent = parents[next];
                match color[parent.0] {
                    WHITE => {
                        color[parent.0] = GREY;
                        stack.push((parent, 0));
                    }
                    GREY => {
                        return Err(GradnetError::InvariantViolation(format!(
                            "cycle detected during topological sort at {parent}"
                        )));
                    }
                    _ => {}
                }
            } else {
                color[id.0] = BLACK;
                post_order.push(id);
                stack.pop();
            }
        }

        // Post-order lists parents before children; reversed, every node
        // comes after all of its dependents.
        post_order.reverse();
        Ok(post_order)
    }

    /// Frees every ephemeral node and zeroes the surviving parameters'
    /// gradients, returning the graph to the unbuilt state.
    ///
    /// Gradients must never carry over between steps; ephemeral nodes must
    /// never outlive the step that created them.
    pub fn prune(&mut self) -> Result<()> {
        if let Some(offset) = self.nodes[self.trainable_len..]
            .iter()
            .position(|n| n.trainable)
        {
            return Err(GradnetError::InvariantViolation(format!(
                "prune would free trainable node {}",
                NodeId(self.trainable_len + offset)
            )));
        }

        let freed = self.num_ephemeral();
        self.nodes.truncate(self.trainable_len);
        for node in &mut self.nodes {
            node.grad = 0.0;
            node.visited = false;
            node.topo_index = 0;
        }
        self.head = None;
        self.registry.clear();
        self.state = GraphState::Unbuilt;
        debug!(
            "pruned {freed} ephemeral nodes, {} parameters retained",
            self.trainable_len
        );
        Ok(())
    }

    /// Zeroes all gradients without freeing anything. `prune` already does
    /// this for parameters; this exists for callers that skip pruning.
    pub fn zero_gradients(&mut self) {
        for node in &mut self.nodes {
            node.grad = 0.0;
        }
    }

    /// Rewires a node's parent edges, bypassing the DAG-by-construction
    /// guarantee. Only the cycle-detection tests need this.
    #[cfg(test)]
    pub(crate) fn rewire_parents(&mut self, id: NodeId, parents: Vec<NodeId>) {
        self.nodes[id.0].parents = parents;
    }
}
