//! Elementwise arithmetic: add, sub, neg, mul, div, and power with a fixed
//! exponent. Binary operations broadcast their operands to a common shape;
//! the matching gradient reduction happens during the backward pass.

use crate::broadcast::broadcast_zip;
use crate::error::TensorGradError;
use crate::graph::{Graph, NodeId};
use crate::op::Op;

fn binary_op(
    graph: &Graph,
    a: NodeId,
    b: NodeId,
    op: Op,
    f: impl Fn(f64, f64) -> f64,
) -> Result<NodeId, TensorGradError> {
    let data = {
        let nodes = graph.nodes.borrow();
        broadcast_zip(&nodes[a.0].data, &nodes[b.0].data, f)?
    };
    Ok(graph.push(data, op))
}

/// Elementwise `a + b` with broadcasting.
pub fn add_op(graph: &Graph, a: NodeId, b: NodeId) -> Result<NodeId, TensorGradError> {
    binary_op(graph, a, b, Op::Add(a, b), |x, y| x + y)
}

/// Elementwise `a - b` with broadcasting.
pub fn sub_op(graph: &Graph, a: NodeId, b: NodeId) -> Result<NodeId, TensorGradError> {
    binary_op(graph, a, b, Op::Sub(a, b), |x, y| x - y)
}

/// Elementwise `a * b` with broadcasting.
pub fn mul_op(graph: &Graph, a: NodeId, b: NodeId) -> Result<NodeId, TensorGradError> {
    binary_op(graph, a, b, Op::Mul(a, b), |x, y| x * y)
}

/// Elementwise `a / b` with broadcasting. Division by zero follows
/// floating-point semantics and produces non-finite values.
pub fn div_op(graph: &Graph, a: NodeId, b: NodeId) -> Result<NodeId, TensorGradError> {
    binary_op(graph, a, b, Op::Div(a, b), |x, y| x / y)
}

/// Elementwise negation.
pub fn neg_op(graph: &Graph, a: NodeId) -> NodeId {
    let data = graph.nodes.borrow()[a.0].data.mapv(|x| -x);
    graph.push(data, Op::Neg(a))
}

/// Elementwise `a` raised to a fixed real `exponent`.
pub fn pow_op(graph: &Graph, a: NodeId, exponent: f64) -> NodeId {
    let data = graph.nodes.borrow()[a.0].data.mapv(|x| x.powf(exponent));
    graph.push(data, Op::Pow(a, exponent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TensorGradError;
    use crate::graph::Graph;
    use approx::assert_relative_eq;

    #[test]
    fn add_broadcasts_row_against_matrix() {
        let g = Graph::new();
        let a = g.from_vec(vec![1.0, 2.0, 3.0], &[1, 3]).unwrap();
        let b = g
            .from_vec(vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0], &[2, 3])
            .unwrap();
        let c = a + b;
        assert_eq!(c.shape(), vec![2, 3]);
        assert_eq!(
            c.data().into_raw_vec_and_offset().0,
            vec![11.0, 22.0, 33.0, 41.0, 52.0, 63.0]
        );
    }

    #[test]
    fn forward_values_match_direct_computation() {
        let g = Graph::new();
        let a = g.scalar(2.0);
        let b = g.scalar(-3.0);
        assert_eq!((a * b).item(), -6.0);
        assert_eq!((a - b).item(), 5.0);
        assert_eq!((a / b).item(), 2.0 / -3.0);
        assert_eq!((-a).item(), -2.0);
        assert_eq!(a.pow(3.0).item(), 8.0);
    }

    #[test]
    fn failed_op_leaves_graph_unmodified() {
        let g = Graph::new();
        let a = g.from_vec(vec![1.0, 2.0], &[2]).unwrap();
        let b = g.from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap();
        let before = g.len();
        let err = add_op(&g, a.id(), b.id()).unwrap_err();
        assert!(matches!(err, TensorGradError::BroadcastError { .. }));
        assert_eq!(g.len(), before);
    }

    #[test]
    fn mul_backward_exchanges_operands() {
        let g = Graph::new();
        let a = g.scalar(2.0);
        let b = g.scalar(-3.0);
        let y = a * b;
        y.backward().unwrap();
        assert_eq!(a.grad_item(), -3.0);
        assert_eq!(b.grad_item(), 2.0);
    }

    #[test]
    fn div_backward_matches_quotient_rule() {
        let g = Graph::new();
        let a = g.scalar(1.0);
        let b = g.scalar(4.0);
        let y = a / b;
        y.backward().unwrap();
        assert_relative_eq!(a.grad_item(), 0.25);
        assert_relative_eq!(b.grad_item(), -1.0 / 16.0);
    }

    #[test]
    fn pow_backward_uses_fixed_exponent() {
        let g = Graph::new();
        let a = g.scalar(3.0);
        let y = a.pow(2.0);
        y.backward().unwrap();
        assert_relative_eq!(a.grad_item(), 6.0);
    }

    #[test]
    fn sub_backward_negates_second_operand() {
        let g = Graph::new();
        let a = g.scalar(5.0);
        let b = g.scalar(2.0);
        let y = a - b;
        y.backward().unwrap();
        assert_eq!(a.grad_item(), 1.0);
        assert_eq!(b.grad_item(), -1.0);
    }

    #[test]
    fn scalar_operands_promote_to_leaves() {
        let g = Graph::new();
        let a = g.scalar(2.0);
        let y = 3.0 * a + 1.0;
        assert_eq!(y.item(), 7.0);
        y.backward().unwrap();
        assert_eq!(a.grad_item(), 3.0);
    }

    #[test]
    #[should_panic(expected = "different graphs")]
    fn mixing_graphs_in_operator_panics() {
        let g1 = Graph::new();
        let g2 = Graph::new();
        let a = g1.scalar(1.0);
        let b = g2.scalar(2.0);
        let _ = a + b;
    }
}
