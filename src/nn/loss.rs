// loss.rs
// Scalar loss heads built from graph ops. Both losses expect column vectors
// and return the NodeId of the scalar result, ready to be passed to
// `Graph::build` and `Graph::propagate_back`.

use crate::error::{GradnetError, Result};
use crate::graph::{Graph, NodeId};
use crate::tensor::{MapOp, Tensor};

fn check_columns(
    predictions: &Tensor,
    targets: &Tensor,
    operation: &'static str,
) -> Result<()> {
    if predictions.shape() != targets.shape() {
        return Err(GradnetError::ShapeMismatch {
            operation,
            expected: predictions.shape(),
            actual: targets.shape(),
        });
    }
    if predictions.cols() != 1 {
        return Err(GradnetError::ShapeMismatch {
            operation,
            expected: (predictions.rows(), 1),
            actual: predictions.shape(),
        });
    }
    Ok(())
}

/// Sum of squared errors, wired as (p - t)^T . (p - t).
///
/// The difference column contracted against its own transpose yields a 1x1
/// tensor whose single node is the loss head. Every prediction cell feeds
/// that head through two paths (once per factor of the square), which is
/// exactly what gives the familiar 2 * (p - t) gradient.
pub fn l2_loss(predictions: &Tensor, targets: &Tensor, graph: &mut Graph) -> Result<NodeId> {
    check_columns(predictions, targets, "l2_loss")?;
    let diff = predictions.subtract(targets, graph)?;
    let squared = diff.transpose().dot(&diff, graph)?;
    Ok(squared.node(0, 0))
}

/// Sum of absolute errors, one Abs cell per row summed by a single n-ary Add.
pub fn l1_loss(predictions: &Tensor, targets: &Tensor, graph: &mut Graph) -> Result<NodeId> {
    check_columns(predictions, targets, "l1_loss")?;
    let diff = predictions.subtract(targets, graph)?;
    let abs = diff.map(MapOp::Abs, graph)?;
    graph.add(&abs.node_ids())
}
