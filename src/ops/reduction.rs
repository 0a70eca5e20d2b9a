//! Reductions: full sum to a scalar, and single-axis sum.

use ndarray::{arr0, Axis};

use crate::error::TensorGradError;
use crate::graph::{Graph, NodeId};
use crate::op::Op;

/// Total of all elements as a 0-d scalar.
pub fn sum_op(graph: &Graph, a: NodeId) -> NodeId {
    let total = graph.nodes.borrow()[a.0].data.sum();
    graph.push(arr0(total).into_dyn(), Op::Sum(a))
}

/// Sum along `axis`. With `keepdims` the reduced axis is kept at size 1,
/// otherwise it is removed.
pub fn sum_axis_op(
    graph: &Graph,
    a: NodeId,
    axis: usize,
    keepdims: bool,
) -> Result<NodeId, TensorGradError> {
    let data = {
        let nodes = graph.nodes.borrow();
        let input = &nodes[a.0].data;
        if axis >= input.ndim() {
            return Err(TensorGradError::AxisOutOfBounds {
                axis,
                shape: input.shape().to_vec(),
            });
        }
        let mut out = input.sum_axis(Axis(axis));
        if keepdims {
            out = out.insert_axis(Axis(axis));
        }
        out
    };
    Ok(graph.push(
        data,
        Op::SumAxis {
            input: a,
            axis,
            keepdims,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    #[test]
    fn sum_produces_scalar_total() {
        let g = Graph::new();
        let x = g
            .from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3])
            .unwrap();
        let y = x.sum();
        assert!(y.shape().is_empty());
        assert_eq!(y.item(), 21.0);
    }

    #[test]
    fn sum_backward_distributes_to_every_element() {
        let g = Graph::new();
        let x = g.from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let y = x.sum();
        y.backward().unwrap();
        assert_eq!(x.grad().into_raw_vec_and_offset().0, vec![1.0; 4]);
    }

    #[test]
    fn sum_axis_forward_shapes() {
        let g = Graph::new();
        let x = g
            .from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3])
            .unwrap();
        let rows = x.sum_axis(0, false).unwrap();
        assert_eq!(rows.shape(), vec![3]);
        assert_eq!(rows.data().into_raw_vec_and_offset().0, vec![5.0, 7.0, 9.0]);

        let kept = x.sum_axis(1, true).unwrap();
        assert_eq!(kept.shape(), vec![2, 1]);
        assert_eq!(kept.data().into_raw_vec_and_offset().0, vec![6.0, 15.0]);
    }

    #[test]
    fn sum_axis_backward_broadcasts_back() {
        let g = Graph::new();
        let x = g
            .from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3])
            .unwrap();
        let y = x.sum_axis(1, false).unwrap().sum();
        y.backward().unwrap();
        assert_eq!(x.grad().into_raw_vec_and_offset().0, vec![1.0; 6]);
    }

    #[test]
    fn sum_axis_rejects_out_of_range_axis() {
        let g = Graph::new();
        let x = g.from_vec(vec![1.0, 2.0], &[2]).unwrap();
        let before = g.len();
        let err = sum_axis_op(&g, x.id(), 1, false).unwrap_err();
        assert_eq!(
            err,
            TensorGradError::AxisOutOfBounds {
                axis: 1,
                shape: vec![2],
            }
        );
        assert_eq!(g.len(), before);
    }
}
