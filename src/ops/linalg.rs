//! 2-D matrix multiplication.

use ndarray::{ArrayD, ArrayViewD, Ix2};

use crate::error::TensorGradError;
use crate::graph::{Graph, NodeId};
use crate::op::Op;

/// Raw 2-D matrix product on array views. Shared between the forward pass
/// and the transpose-based backward rules.
pub(crate) fn matmul_data(
    a: ArrayViewD<'_, f64>,
    b: ArrayViewD<'_, f64>,
) -> Result<ArrayD<f64>, TensorGradError> {
    let shape_a = a.shape().to_vec();
    let shape_b = b.shape().to_vec();
    let incompatible = || TensorGradError::IncompatibleShapes {
        shape1: shape_a.clone(),
        shape2: shape_b.clone(),
        operation: "matmul".to_string(),
    };
    let a2 = a.into_dimensionality::<Ix2>().map_err(|_| incompatible())?;
    let b2 = b.into_dimensionality::<Ix2>().map_err(|_| incompatible())?;
    if a2.ncols() != b2.nrows() {
        return Err(incompatible());
    }
    Ok(a2.dot(&b2).into_dyn())
}

/// Matrix product `a @ b` for 2-D operands: `[m, k] @ [k, n] -> [m, n]`.
pub fn matmul_op(graph: &Graph, a: NodeId, b: NodeId) -> Result<NodeId, TensorGradError> {
    let data = {
        let nodes = graph.nodes.borrow();
        matmul_data(nodes[a.0].data.view(), nodes[b.0].data.view())?
    };
    Ok(graph.push(data, Op::Matmul(a, b)))
}
