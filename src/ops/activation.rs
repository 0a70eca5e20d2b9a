//! Elementwise nonlinearities: relu and tanh.

use crate::graph::{Graph, NodeId};
use crate::op::Op;

/// Elementwise `max(x, 0)`.
pub fn relu_op(graph: &Graph, a: NodeId) -> NodeId {
    let data = graph.nodes.borrow()[a.0]
        .data
        .mapv(|x| if x > 0.0 { x } else { 0.0 });
    graph.push(data, Op::Relu(a))
}

/// Elementwise hyperbolic tangent.
pub fn tanh_op(graph: &Graph, a: NodeId) -> NodeId {
    let data = graph.nodes.borrow()[a.0].data.mapv(f64::tanh);
    graph.push(data, Op::Tanh(a))
}
