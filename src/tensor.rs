// tensor.rs
// A 2-D grid of node handles layered over the scalar graph. Tensors do not
// own their nodes: arithmetic and activation ops allocate fresh nodes in the
// graph, while `transpose` is a pure view that references the same nodes at
// swapped coordinates.

use ndarray::Array2;

use crate::error::{GradnetError, Result};
use crate::graph::{Graph, NodeId};

/// Unary op applied cell-by-cell through [`Tensor::map`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapOp {
    Relu,
    Sigmoid,
    Tanh,
    Exp,
    Log,
    Sqrt,
    Abs,
}

/// Rectangular grid of [`NodeId`]s in row-major order.
#[derive(Debug, Clone)]
pub struct Tensor {
    cells: Array2<NodeId>,
}

impl Tensor {
    /// Tensor of fresh ephemeral constant nodes, all zero.
    pub fn zeros(graph: &mut Graph, rows: usize, cols: usize) -> Self {
        let cells = Array2::from_shape_fn((rows, cols), |_| graph.constant(0.0));
        Self { cells }
    }

    /// Tensor of ephemeral constant leaves holding the given values.
    pub fn from_array(graph: &mut Graph, values: &Array2<f64>) -> Self {
        let cells = values.map(|&v| graph.constant(v));
        Self { cells }
    }

    pub fn from_vec(
        graph: &mut Graph,
        data: Vec<f64>,
        rows: usize,
        cols: usize,
    ) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(GradnetError::InvalidState(format!(
                "cannot shape {} values into a {rows}x{cols} tensor",
                data.len()
            )));
        }
        let ids: Vec<NodeId> = data.into_iter().map(|v| graph.constant(v)).collect();
        let cells = Array2::from_shape_vec((rows, cols), ids)
            .map_err(|e| GradnetError::InvalidState(e.to_string()))?;
        Ok(Self { cells })
    }

    /// Tensor of trainable parameter leaves. Only valid while the graph holds
    /// no ephemeral nodes (see [`Graph::leaf`]).
    pub fn from_vec_trainable(
        graph: &mut Graph,
        data: Vec<f64>,
        rows: usize,
        cols: usize,
    ) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(GradnetError::InvalidState(format!(
                "cannot shape {} values into a {rows}x{cols} tensor",
                data.len()
            )));
        }
        let mut ids = Vec::with_capacity(data.len());
        for v in data {
            ids.push(graph.leaf(v, true)?);
        }
        let cells = Array2::from_shape_vec((rows, cols), ids)
            .map_err(|e| GradnetError::InvalidState(e.to_string()))?;
        Ok(Self { cells })
    }

    pub fn rows(&self) -> usize {
        self.cells.nrows()
    }

    pub fn cols(&self) -> usize {
        self.cells.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    pub fn node(&self, i: usize, j: usize) -> NodeId {
        self.cells[[i, j]]
    }

    /// Node ids in row-major order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.cells.iter().copied().collect()
    }

    pub fn value(&self, graph: &Graph, i: usize, j: usize) -> Result<f64> {
        graph.value(self.cells[[i, j]])
    }

    pub fn grad(&self, graph: &Graph, i: usize, j: usize) -> Result<f64> {
        graph.grad(self.cells[[i, j]])
    }

    /// Snapshot of all cell values, for external logging.
    pub fn values(&self, graph: &Graph) -> Result<Array2<f64>> {
        let mut out = Array2::zeros(self.cells.raw_dim());
        for ((i, j), &id) in self.cells.indexed_iter() {
            out[[i, j]] = graph.value(id)?;
        }
        Ok(out)
    }

    /// Snapshot of all cell gradients, for external logging.
    pub fn grads(&self, graph: &Graph) -> Result<Array2<f64>> {
        let mut out = Array2::zeros(self.cells.raw_dim());
        for ((i, j), &id) in self.cells.indexed_iter() {
            out[[i, j]] = graph.grad(id)?;
        }
        Ok(out)
    }

    fn check_same_shape(&self, other: &Tensor, operation: &'static str) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(GradnetError::ShapeMismatch {
                operation,
                expected: self.shape(),
                actual: other.shape(),
            });
        }
        Ok(())
    }

    /// Elementwise sum; allocates one Add node per cell.
    pub fn add(&self, other: &Tensor, graph: &mut Graph) -> Result<Tensor> {
        self.check_same_shape(other, "tensor add")?;
        let mut ids = Vec::with_capacity(self.cells.len());
        for (&a, &b) in self.cells.iter().zip(other.cells.iter()) {
            ids.push(graph.add(&[a, b])?);
        }
        Self::from_ids(ids, self.shape())
    }

    /// Elementwise difference; allocates one Subtract node per cell.
    pub fn subtract(&self, other: &Tensor, graph: &mut Graph) -> Result<Tensor> {
        self.check_same_shape(other, "tensor subtract")?;
        let mut ids = Vec::with_capacity(self.cells.len());
        for (&a, &b) in self.cells.iter().zip(other.cells.iter()) {
            ids.push(graph.subtract(a, b)?);
        }
        Self::from_ids(ids, self.shape())
    }

    /// Multiplies every cell with a fresh constant node carrying `scalar`, so
    /// the scaling takes part in the backward pass.
    pub fn scalar_multiply(&self, scalar: f64, graph: &mut Graph) -> Result<Tensor> {
        let mut ids = Vec::with_capacity(self.cells.len());
        for &a in self.cells.iter() {
            let c = graph.constant(scalar);
            ids.push(graph.multiply(&[a, c])?);
        }
        Self::from_ids(ids, self.shape())
    }

    /// Logical view at swapped coordinates: the returned tensor references
    /// the SAME underlying nodes, no allocation happens. Transposing twice
    /// yields a tensor cell-for-cell identical to the original.
    pub fn transpose(&self) -> Tensor {
        Tensor {
            cells: self.cells.t().to_owned(),
        }
    }

    /// Matrix product, `self.cols == other.rows` required.
    ///
    /// Each output cell (i, j) is one n-ary Add node whose parents are the
    /// `cols` contraction terms `self[i,k] * other[k,j]`. Naive triple loop;
    /// O(rows_a * cols_b * cols_a) node allocations.
    pub fn dot(&self, other: &Tensor, graph: &mut Graph) -> Result<Tensor> {
        if self.cols() != other.rows() {
            return Err(GradnetError::ShapeMismatch {
                operation: "tensor dot",
                expected: (self.cols(), other.cols()),
                actual: other.shape(),
            });
        }
        let (rows, cols, inner) = (self.rows(), other.cols(), self.cols());
        let mut ids = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                let mut terms = Vec::with_capacity(inner);
                for k in 0..inner {
                    terms.push(graph.multiply(&[self.cells[[i, k]], other.cells[[k, j]]])?);
                }
                ids.push(graph.add(&terms)?);
            }
        }
        Self::from_ids(ids, (rows, cols))
    }

    /// Applies a scalar op independently to every cell, producing a new
    /// tensor of new nodes.
    pub fn map(&self, op: MapOp, graph: &mut Graph) -> Result<Tensor> {
        let mut ids = Vec::with_capacity(self.cells.len());
        for &id in self.cells.iter() {
            let mapped = match op {
                MapOp::Relu => graph.relu(id)?,
                MapOp::Sigmoid => graph.sigmoid(id)?,
                MapOp::Tanh => graph.tanh(id)?,
                MapOp::Exp => graph.exp(id)?,
                MapOp::Log => graph.log(id)?,
                MapOp::Sqrt => graph.sqrt(id)?,
                // |x| as multiplication with a sign constant; the derivative
                // through the product is the sign, which is what we want away
                // from zero.
                MapOp::Abs => {
                    let sign = if graph.value(id)? < 0.0 { -1.0 } else { 1.0 };
                    let c = graph.constant(sign);
                    graph.multiply(&[id, c])?
                }
            };
            ids.push(mapped);
        }
        Self::from_ids(ids, self.shape())
    }

    /// Euclidean norm of the flattened grid. A monitoring reduction only: it
    /// reads values and allocates nothing, so it is invisible to the backward
    /// pass.
    pub fn frobenius_norm(&self, graph: &Graph) -> Result<f64> {
        let mut sum = 0.0;
        for &id in self.cells.iter() {
            let v = graph.value(id)?;
            sum += v * v;
        }
        Ok(sum.sqrt())
    }

    /// Assembles a tensor over already existing nodes, row-major.
    pub fn from_node_ids(ids: Vec<NodeId>, shape: (usize, usize)) -> Result<Tensor> {
        Self::from_ids(ids, shape)
    }

    fn from_ids(ids: Vec<NodeId>, shape: (usize, usize)) -> Result<Tensor> {
        let cells = Array2::from_shape_vec(shape, ids)
            .map_err(|e| GradnetError::InvalidState(e.to_string()))?;
        Ok(Tensor { cells })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn transpose_is_a_view_sharing_nodes() {
        let mut g = Graph::new();
        let t = Tensor::from_array(&mut g, &array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);

        let tt = t.transpose();
        assert_eq!(tt.shape(), (3, 2));
        assert_eq!(tt.node(2, 1), t.node(1, 2));

        // Double transpose references the identical nodes, cell for cell.
        let back = tt.transpose();
        for i in 0..t.rows() {
            for j in 0..t.cols() {
                assert_eq!(back.node(i, j), t.node(i, j));
            }
        }
        // No nodes were allocated by any of this.
        assert_eq!(g.num_nodes(), 6);
    }

    #[test]
    fn elementwise_ops_check_shapes() {
        let mut g = Graph::new();
        let a = Tensor::zeros(&mut g, 2, 3);
        let b = Tensor::zeros(&mut g, 3, 2);

        let err = a.add(&b, &mut g).unwrap_err();
        assert_eq!(
            err,
            GradnetError::ShapeMismatch {
                operation: "tensor add",
                expected: (2, 3),
                actual: (3, 2),
            }
        );
        assert!(a.subtract(&b, &mut g).is_err());
    }

    #[test]
    fn add_and_subtract_values() {
        let mut g = Graph::new();
        let a = Tensor::from_array(&mut g, &array![[1.0, 2.0], [3.0, 4.0]]);
        let b = Tensor::from_array(&mut g, &array![[10.0, 20.0], [30.0, 40.0]]);

        let sum = a.add(&b, &mut g).unwrap();
        assert_eq!(sum.values(&g).unwrap(), array![[11.0, 22.0], [33.0, 44.0]]);

        let diff = b.subtract(&a, &mut g).unwrap();
        assert_eq!(diff.values(&g).unwrap(), array![[9.0, 18.0], [27.0, 36.0]]);
    }

    #[test]
    fn scalar_multiply_wires_through_the_graph() {
        let mut g = Graph::new();
        let a = Tensor::from_array(&mut g, &array![[2.0, -3.0]]);
        let scaled = a.scalar_multiply(0.5, &mut g).unwrap();
        assert_eq!(scaled.values(&g).unwrap(), array![[1.0, -1.5]]);
        // Each scaled cell is a Multiply node parented on the source cell.
        let node = g.get_node(scaled.node(0, 0)).unwrap();
        assert_eq!(node.parents[0], a.node(0, 0));
    }

    #[test]
    fn dot_product_values_and_shape() {
        let mut g = Graph::new();
        let a = Tensor::from_array(&mut g, &array![[1.0, 2.0], [3.0, 4.0]]);
        let b = Tensor::from_array(&mut g, &array![[5.0], [6.0]]);

        let c = a.dot(&b, &mut g).unwrap();
        assert_eq!(c.shape(), (2, 1));
        assert_eq!(c.values(&g).unwrap(), array![[17.0], [39.0]]);

        // Inner dimensions must agree.
        assert!(b.dot(&a, &mut g).is_err());
    }

    #[test]
    fn map_applies_per_cell() {
        let mut g = Graph::new();
        let a = Tensor::from_array(&mut g, &array![[-1.0, 4.0]]);

        let r = a.map(MapOp::Relu, &mut g).unwrap();
        assert_eq!(r.values(&g).unwrap(), array![[0.0, 4.0]]);

        let s = a.map(MapOp::Abs, &mut g).unwrap();
        assert_eq!(s.values(&g).unwrap(), array![[1.0, 4.0]]);

        let q = a.map(MapOp::Sqrt, &mut g);
        assert!(matches!(
            q.unwrap_err(),
            GradnetError::DomainError { op: "sqrt", .. }
        ));
    }

    #[test]
    fn frobenius_norm_reads_values_only() {
        let mut g = Graph::new();
        let a = Tensor::from_array(&mut g, &array![[3.0, 4.0]]);
        let before = g.num_nodes();
        assert_relative_eq!(a.frobenius_norm(&g).unwrap(), 5.0);
        assert_eq!(g.num_nodes(), before);
    }
}
