//! The backward pass: topological discovery of the ancestor graph and the
//! chain-rule dispatch that accumulates gradient contributions into every
//! reachable node.

pub mod grad_check;

use log::debug;
use ndarray::{ArrayD, Axis, Zip};

use crate::broadcast::{broadcast_zip, reduce_grad};
use crate::error::TensorGradError;
use crate::graph::{Graph, Node, NodeId, Var};
use crate::op::Op;
use crate::ops::linalg::matmul_data;

impl Graph {
    /// Runs the backward pass from `id`.
    ///
    /// Seeds the terminal with an all-ones gradient of its own shape (for a
    /// 0-d terminal this is the scalar 1.0; for an array-shaped terminal
    /// this is the summed-gradient convention, i.e. the result is the
    /// gradient of `sum(terminal)`), then walks the reverse topological
    /// order and accumulates each operation's broadcast-reduced local
    /// contribution into its producers.
    ///
    /// Gradient buffers are pure accumulators: repeated calls without
    /// [`Graph::zero_grad`] in between add up, so two identical passes leave
    /// every reachable node with exactly twice the gradient.
    pub fn backward(&self, id: NodeId) -> Result<(), TensorGradError> {
        let mut nodes = self.nodes.borrow_mut();
        let order = topological_sort(&nodes, id)?;
        debug!(
            "backward from node {} over {} of {} nodes",
            id.0,
            order.len(),
            nodes.len()
        );

        // Per-pass gradient flow, kept separate from the persistent
        // accumulators so that each pass contributes exactly once.
        let mut flows: Vec<Option<ArrayD<f64>>> = vec![None; nodes.len()];
        flows[id.0] = Some(ArrayD::ones(nodes[id.0].data.raw_dim()));

        for nid in order {
            let Some(upstream) = flows[nid.0].take() else {
                continue;
            };
            for (pid, contribution) in local_gradients(&nodes, nid, &upstream)? {
                match &mut flows[pid.0] {
                    Some(existing) => *existing += &contribution,
                    slot => *slot = Some(contribution),
                }
            }
            nodes[nid.0].grad += &upstream;
        }
        Ok(())
    }
}

impl Var<'_> {
    /// Backward pass from this variable; see [`Graph::backward`].
    pub fn backward(&self) -> Result<(), TensorGradError> {
        self.graph.backward(self.id)
    }
}

/// Orders every node reachable from `root` via producer edges so that each
/// node appears before all of its producers (`root` first).
///
/// Depth-first post-order with a visited set, so a node that is an ancestor
/// along multiple paths is emitted exactly once; the post-order is reversed
/// before returning. Producer indices are always smaller than their
/// consumer's, which doubles as an internal acyclicity check.
pub(crate) fn topological_sort(
    nodes: &[Node],
    root: NodeId,
) -> Result<Vec<NodeId>, TensorGradError> {
    let mut visited = vec![false; nodes.len()];
    let mut order = Vec::new();
    visit(nodes, root, &mut visited, &mut order)?;
    order.reverse();
    Ok(order)
}

fn visit(
    nodes: &[Node],
    id: NodeId,
    visited: &mut [bool],
    order: &mut Vec<NodeId>,
) -> Result<(), TensorGradError> {
    if visited[id.0] {
        return Ok(());
    }
    visited[id.0] = true;
    for producer in nodes[id.0].op.producers() {
        if producer.0 >= id.0 {
            return Err(TensorGradError::CycleDetected);
        }
        visit(nodes, producer, visited, order)?;
    }
    order.push(id);
    Ok(())
}

/// Single dispatch of the local backward rules.
///
/// Given a node's operation record and the gradient that has flowed into it,
/// returns the contribution for each producer, already reduced to that
/// producer's shape (summed over every axis the forward broadcast
/// stretched).
fn local_gradients(
    nodes: &[Node],
    id: NodeId,
    g: &ArrayD<f64>,
) -> Result<Vec<(NodeId, ArrayD<f64>)>, TensorGradError> {
    let node = &nodes[id.0];
    let contribs = match node.op {
        Op::Leaf => vec![],
        Op::Add(a, b) => vec![
            (a, reduce_grad(g, nodes[a.0].data.shape())?),
            (b, reduce_grad(g, nodes[b.0].data.shape())?),
        ],
        Op::Sub(a, b) => vec![
            (a, reduce_grad(g, nodes[a.0].data.shape())?),
            (b, reduce_grad(&g.mapv(|x| -x), nodes[b.0].data.shape())?),
        ],
        Op::Neg(a) => vec![(a, g.mapv(|x| -x))],
        Op::Mul(a, b) => {
            let da = broadcast_zip(g, &nodes[b.0].data, |gv, y| gv * y)?;
            let db = broadcast_zip(g, &nodes[a.0].data, |gv, x| gv * x)?;
            vec![
                (a, reduce_grad(&da, nodes[a.0].data.shape())?),
                (b, reduce_grad(&db, nodes[b.0].data.shape())?),
            ]
        }
        Op::Div(a, b) => {
            let da = broadcast_zip(g, &nodes[b.0].data, |gv, y| gv / y)?;
            let ga = broadcast_zip(g, &nodes[a.0].data, |gv, x| gv * x)?;
            let db = broadcast_zip(&ga, &nodes[b.0].data, |t, y| -t / (y * y))?;
            vec![
                (a, reduce_grad(&da, nodes[a.0].data.shape())?),
                (b, reduce_grad(&db, nodes[b.0].data.shape())?),
            ]
        }
        Op::Pow(a, k) => {
            let da = Zip::from(g)
                .and(&nodes[a.0].data)
                .map_collect(|&gv, &x| gv * k * x.powf(k - 1.0));
            vec![(a, da)]
        }
        Op::Matmul(a, b) => {
            let da = matmul_data(g.view(), nodes[b.0].data.t())?;
            let db = matmul_data(nodes[a.0].data.t(), g.view())?;
            vec![(a, da), (b, db)]
        }
        Op::Relu(a) => {
            let da = Zip::from(g)
                .and(&nodes[a.0].data)
                .map_collect(|&gv, &x| if x > 0.0 { gv } else { 0.0 });
            vec![(a, da)]
        }
        Op::Exp(a) => {
            // d(e^x) = e^x, which is the forward output itself.
            let da = Zip::from(g).and(&node.data).map_collect(|&gv, &y| gv * y);
            vec![(a, da)]
        }
        Op::Log(a) => {
            let da = Zip::from(g)
                .and(&nodes[a.0].data)
                .map_collect(|&gv, &x| gv / x);
            vec![(a, da)]
        }
        Op::Tanh(a) => {
            let da = Zip::from(g)
                .and(&node.data)
                .map_collect(|&gv, &y| gv * (1.0 - y * y));
            vec![(a, da)]
        }
        Op::Sum(a) => {
            let da = ArrayD::from_elem(nodes[a.0].data.raw_dim(), g.sum());
            vec![(a, da)]
        }
        Op::SumAxis {
            input,
            axis,
            keepdims,
        } => {
            let mut gv = g.clone();
            if !keepdims {
                gv = gv.insert_axis(Axis(axis));
            }
            let target = nodes[input.0].data.raw_dim();
            let da = gv
                .broadcast(target)
                .ok_or_else(|| {
                    TensorGradError::InternalError(format!(
                        "sum_axis gradient of shape {:?} does not broadcast back to {:?}",
                        g.shape(),
                        nodes[input.0].data.shape()
                    ))
                })?
                .to_owned();
            vec![(input, da)]
        }
    };
    Ok(contribs)
}
