//! Elementwise transcendental functions: exp and log.

use crate::graph::{Graph, NodeId};
use crate::op::Op;

/// Elementwise `e^x`.
pub fn exp_op(graph: &Graph, a: NodeId) -> NodeId {
    let data = graph.nodes.borrow()[a.0].data.mapv(f64::exp);
    graph.push(data, Op::Exp(a))
}

/// Elementwise natural logarithm.
///
/// Non-positive inputs yield `-inf` or NaN; the engine does not clip or
/// special-case them, so non-finiteness propagates through values and
/// gradients per IEEE-754.
pub fn log_op(graph: &Graph, a: NodeId) -> NodeId {
    let data = graph.nodes.borrow()[a.0].data.mapv(f64::ln);
    graph.push(data, Op::Log(a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use approx::assert_relative_eq;

    #[test]
    fn exp_backward_reuses_forward_output() {
        let g = Graph::new();
        let x = g.scalar(1.5);
        let y = x.exp();
        y.backward().unwrap();
        assert_relative_eq!(y.item(), 1.5f64.exp());
        assert_relative_eq!(x.grad_item(), 1.5f64.exp());
    }

    #[test]
    fn log_backward_is_reciprocal() {
        let g = Graph::new();
        let x = g.scalar(4.0);
        let y = x.log();
        y.backward().unwrap();
        assert_relative_eq!(y.item(), 4.0f64.ln());
        assert_relative_eq!(x.grad_item(), 0.25);
    }

    #[test]
    fn log_of_non_positive_propagates_non_finite() {
        let g = Graph::new();
        let x = g.from_vec(vec![0.0, -1.0], &[2]).unwrap();
        let y = x.log();
        let data = y.data();
        assert_eq!(data[[0]], f64::NEG_INFINITY);
        assert!(data[[1]].is_nan());

        y.sum().backward().unwrap();
        let grad = x.grad();
        assert_eq!(grad[[0]], f64::INFINITY);
        assert_eq!(grad[[1]], -1.0);
    }
}
