//! The expression-graph arena and the user-facing variable handle.

use std::cell::RefCell;

use log::trace;
use ndarray::{arr0, ArrayD, IxDyn};

use crate::error::TensorGradError;
use crate::op::Op;

/// Index of a node inside its owning [`Graph`].
///
/// Producers always have strictly smaller indices than the nodes that
/// consume them, since operations only reference already-existing nodes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(pub(crate) usize);

/// One vertex of the expression graph: the forward payload, the gradient
/// accumulator of identical shape, and the operation record that produced it.
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) data: ArrayD<f64>,
    pub(crate) grad: ArrayD<f64>,
    pub(crate) op: Op,
}

/// Arena owning every node of one graph-construction session.
///
/// All nodes live in a single `Vec` behind a `RefCell`; handles are plain
/// indices, so the acyclic ownership of the graph never cycles back into the
/// arena's own lifetime. The structure is single-threaded and purely
/// synchronous.
#[derive(Default, Debug)]
pub struct Graph {
    pub(crate) nodes: RefCell<Vec<Node>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes currently in the arena.
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    /// Creates a leaf from an n-dimensional array.
    pub fn value(&self, data: ArrayD<f64>) -> Var<'_> {
        let id = self.push(data, Op::Leaf);
        self.var(id)
    }

    /// Creates a 0-d scalar leaf.
    pub fn scalar(&self, value: f64) -> Var<'_> {
        self.value(arr0(value).into_dyn())
    }

    /// Creates a leaf from a flat buffer in row-major order.
    pub fn from_vec(&self, data: Vec<f64>, shape: &[usize]) -> Result<Var<'_>, TensorGradError> {
        let data_len = data.len();
        let array = ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|_| {
            TensorGradError::ShapeDataMismatch {
                data_len,
                shape: shape.to_vec(),
            }
        })?;
        Ok(self.value(array))
    }

    /// Handle for an existing node.
    pub fn var(&self, id: NodeId) -> Var<'_> {
        debug_assert!(id.0 < self.len(), "node id {} out of bounds", id.0);
        Var { graph: self, id }
    }

    /// Clone of a node's forward payload.
    pub fn data(&self, id: NodeId) -> ArrayD<f64> {
        self.nodes.borrow()[id.0].data.clone()
    }

    /// Clone of a node's accumulated gradient. All zeros before the first
    /// backward pass.
    pub fn grad(&self, id: NodeId) -> ArrayD<f64> {
        self.nodes.borrow()[id.0].grad.clone()
    }

    /// Shape of a node's payload.
    pub fn shape(&self, id: NodeId) -> Vec<usize> {
        self.nodes.borrow()[id.0].data.shape().to_vec()
    }

    /// Resets every gradient buffer in the arena to zero.
    ///
    /// Gradients are pure accumulators: `backward` only ever adds into them,
    /// so repeated passes compound unless the caller zeroes in between.
    pub fn zero_grad(&self) {
        for node in self.nodes.borrow_mut().iter_mut() {
            node.grad.fill(0.0);
        }
    }

    /// Allocates a node and returns its index. The gradient buffer starts
    /// as zeros of the payload's shape.
    pub(crate) fn push(&self, data: ArrayD<f64>, op: Op) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = nodes.len();
        trace!("push node {id}: {op:?} shape {:?}", data.shape());
        let grad = ArrayD::zeros(data.raw_dim());
        nodes.push(Node { data, grad, op });
        NodeId(id)
    }
}

/// Lightweight `Copy` handle pairing a [`Graph`] with a [`NodeId`].
///
/// Arithmetic operators on `Var` are sugar over the named operation
/// functions in [`crate::ops`]; like the operators of the underlying array
/// backend they panic on shape errors, while the named functions report them
/// as [`TensorGradError`].
#[derive(Clone, Copy)]
pub struct Var<'g> {
    pub(crate) graph: &'g Graph,
    pub(crate) id: NodeId,
}

impl<'g> Var<'g> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Clone of the forward payload.
    pub fn data(&self) -> ArrayD<f64> {
        self.graph.data(self.id)
    }

    /// Clone of the accumulated gradient.
    pub fn grad(&self) -> ArrayD<f64> {
        self.graph.grad(self.id)
    }

    pub fn shape(&self) -> Vec<usize> {
        self.graph.shape(self.id)
    }

    /// Scalar payload of a single-element variable.
    ///
    /// Panics if the payload holds more than one element.
    pub fn item(&self) -> f64 {
        let data = self.data();
        assert_eq!(
            data.len(),
            1,
            "item() requires a single-element value, got shape {:?}",
            data.shape()
        );
        data.sum()
    }

    /// Scalar gradient of a single-element variable.
    ///
    /// Panics if the gradient holds more than one element.
    pub fn grad_item(&self) -> f64 {
        let grad = self.grad();
        assert_eq!(
            grad.len(),
            1,
            "grad_item() requires a single-element gradient, got shape {:?}",
            grad.shape()
        );
        grad.sum()
    }

    pub(crate) fn same_graph(&self, other: &Var<'g>) -> Result<(), TensorGradError> {
        if std::ptr::eq(self.graph, other.graph) {
            Ok(())
        } else {
            Err(TensorGradError::GraphMismatch)
        }
    }
}

impl std::fmt::Debug for Var<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Var")
            .field("id", &self.id.0)
            .field("shape", &self.shape())
            .finish()
    }
}
