use crate::graph::NodeId;

/// Operation record stored on every node.
///
/// Instead of a captured closure, each node carries a tagged variant naming
/// the operation that produced it together with the producer indices (and
/// any fixed parameter, such as the exponent for `Pow`). The backward rules
/// for all variants live in a single dispatch function,
/// `autograd::local_gradients`, which makes the operation set statically
/// enumerable.
#[derive(Clone, Debug)]
pub(crate) enum Op {
    /// User-created node; propagation is a no-op.
    Leaf,
    Add(NodeId, NodeId),
    Sub(NodeId, NodeId),
    Neg(NodeId),
    Mul(NodeId, NodeId),
    Div(NodeId, NodeId),
    /// Elementwise power with a fixed real exponent.
    Pow(NodeId, f64),
    Matmul(NodeId, NodeId),
    Relu(NodeId),
    Exp(NodeId),
    Log(NodeId),
    Tanh(NodeId),
    /// Full reduction to a 0-d scalar.
    Sum(NodeId),
    /// Reduction along a single axis.
    SumAxis {
        input: NodeId,
        axis: usize,
        keepdims: bool,
    },
}

impl Op {
    /// Direct inputs of the operation, in forward-call order, with
    /// repetition when the same node was used twice (e.g. `x + x`).
    pub(crate) fn producers(&self) -> Vec<NodeId> {
        match *self {
            Op::Leaf => vec![],
            Op::Add(a, b)
            | Op::Sub(a, b)
            | Op::Mul(a, b)
            | Op::Div(a, b)
            | Op::Matmul(a, b) => vec![a, b],
            Op::Neg(a)
            | Op::Pow(a, _)
            | Op::Relu(a)
            | Op::Exp(a)
            | Op::Log(a)
            | Op::Tanh(a)
            | Op::Sum(a)
            | Op::SumAxis { input: a, .. } => vec![a],
        }
    }
}
