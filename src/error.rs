use thiserror::Error;

/// Error type for graph construction and the backward pass.
///
/// Shape errors are raised synchronously by the offending operation, before
/// any node is pushed, so a failed call leaves the graph unmodified and
/// reusable. Numeric domain errors (log of a non-positive value, division by
/// zero) are *not* represented here: they follow ordinary floating-point
/// semantics and propagate as non-finite values through both passes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorGradError {
    #[error("cannot broadcast shapes {shape1:?} and {shape2:?}")]
    BroadcastError {
        shape1: Vec<usize>,
        shape2: Vec<usize>,
    },

    #[error("incompatible shapes for {operation}: {shape1:?} and {shape2:?}")]
    IncompatibleShapes {
        shape1: Vec<usize>,
        shape2: Vec<usize>,
        operation: String,
    },

    #[error("data length {data_len} does not match shape {shape:?}")]
    ShapeDataMismatch { data_len: usize, shape: Vec<usize> },

    #[error("axis {axis} is out of bounds for shape {shape:?}")]
    AxisOutOfBounds { axis: usize, shape: Vec<usize> },

    #[error("variables belong to different graphs")]
    GraphMismatch,

    #[error("cycle detected in the expression graph during backward")]
    CycleDetected,

    #[error("internal error: {0}")]
    InternalError(String),
}
