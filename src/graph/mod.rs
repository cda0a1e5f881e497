pub mod engine;
pub mod node;

pub use engine::Graph;
pub use node::{Node, NodeId, OpKind};
