// node.rs
// Scalar node of the computational graph: one value, one accumulated gradient,
// parent edges and the tag of the operation that produced it. The backward
// rule is dispatched by matching on `OpKind` rather than through stored
// function pointers, so the compiler checks exhaustiveness for us.

/// Stable handle to a node inside a [`Graph`](crate::graph::Graph) arena.
///
/// Ids are plain indices into the arena vector. Trainable parameters occupy
/// the low index range and survive pruning; ephemeral ids become invalid as
/// soon as `prune` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// The operation that produced a node, which fixes its backward rule.
///
/// `Leaf` nodes have no parents and a no-op backward rule; they are either
/// trainable parameters or constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Leaf,
    /// N-ary sum. Every parent receives the full upstream gradient.
    Add,
    /// First parent minus the remaining ones.
    Subtract,
    /// N-ary product. Each parent receives the upstream gradient times the
    /// product of all other parents' values.
    Multiply,
    Sqrt,
    Exp,
    Log,
    Sigmoid,
    Tanh,
    Relu,
}

impl OpKind {
    /// Local chain-rule step: the contribution this node adds to each
    /// parent's gradient, in parent order.
    ///
    /// `value` is the node's own forward value, `grad` its accumulated
    /// upstream gradient and `parent_values` the forward values of its
    /// parents. Callers must only invoke this once every child of the node
    /// has already contributed to `grad`.
    pub fn parent_contributions(
        &self,
        value: f64,
        grad: f64,
        parent_values: &[f64],
    ) -> Vec<f64> {
        match self {
            OpKind::Leaf => Vec::new(),
            OpKind::Add => vec![grad; parent_values.len()],
            OpKind::Subtract => {
                let mut contribs = vec![-grad; parent_values.len()];
                contribs[0] = grad;
                contribs
            }
            OpKind::Multiply => {
                // d/dx_i (x_0 * .. * x_n) = product of all the other factors.
                (0..parent_values.len())
                    .map(|i| {
                        let others: f64 = parent_values
                            .iter()
                            .enumerate()
                            .filter(|&(j, _)| j != i)
                            .map(|(_, &v)| v)
                            .product();
                        grad * others
                    })
                    .collect()
            }
            // The node's value already IS sqrt(x), so 0.5/sqrt(x) comes
            // straight from it.
            OpKind::Sqrt => vec![grad * 0.5 / value],
            // Likewise value = e^x.
            OpKind::Exp => vec![grad * value],
            OpKind::Log => vec![grad / parent_values[0]],
            OpKind::Sigmoid => vec![grad * value * (1.0 - value)],
            OpKind::Tanh => vec![grad * (1.0 - value * value)],
            OpKind::Relu => {
                if parent_values[0] > 0.0 {
                    vec![grad]
                } else {
                    vec![0.0]
                }
            }
        }
    }

    /// Number of operands the op expects, where fixed. The n-ary ops return
    /// `None` and accept two or more.
    pub fn arity(&self) -> Option<usize> {
        match self {
            OpKind::Leaf => Some(0),
            OpKind::Add | OpKind::Subtract | OpKind::Multiply => None,
            _ => Some(1),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Leaf => "leaf",
            OpKind::Add => "add",
            OpKind::Subtract => "subtract",
            OpKind::Multiply => "multiply",
            OpKind::Sqrt => "sqrt",
            OpKind::Exp => "exp",
            OpKind::Log => "log",
            OpKind::Sigmoid => "sigmoid",
            OpKind::Tanh => "tanh",
            OpKind::Relu => "relu",
        }
    }
}

/// Scalar cell of the computation graph.
///
/// `grad` is a running SUM of contributions from the node's children. It is
/// zero before a forward pass begins and only final once every child has
/// executed its backward step, which the graph guarantees by walking nodes in
/// topological order.
#[derive(Debug, Clone)]
pub struct Node {
    pub value: f64,
    pub grad: f64,
    pub parents: Vec<NodeId>,
    pub op: OpKind,
    pub trainable: bool,
    pub(crate) visited: bool,
    pub(crate) topo_index: usize,
}

impl Node {
    pub fn leaf(value: f64, trainable: bool) -> Self {
        Self {
            value,
            grad: 0.0,
            parents: Vec::new(),
            op: OpKind::Leaf,
            trainable,
            visited: false,
            topo_index: 0,
        }
    }

    pub fn from_op(value: f64, op: OpKind, parents: Vec<NodeId>) -> Self {
        Self {
            value,
            grad: 0.0,
            parents,
            op,
            trainable: false,
            visited: false,
            topo_index: 0,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.op, OpKind::Leaf)
    }
}
