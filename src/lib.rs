//! Reverse-mode automatic differentiation over dynamically built expression
//! graphs of scalar or n-dimensional `f64` arrays.
//!
//! A [`Graph`] is an arena that owns every node created during one
//! construction session. Operations record themselves as they execute: each
//! call computes the forward value, pushes a node tagged with its operation
//! kind and producer indices, and returns a lightweight [`Var`] handle.
//! Calling [`Var::backward`] discovers the ancestor set in reverse
//! topological order and accumulates chain-rule contributions into every
//! reachable node's gradient buffer, reducing broadcast contributions back to
//! each operand's original shape.
//!
//! ```
//! use tensorgrad::Graph;
//!
//! let g = Graph::new();
//! let a = g.scalar(2.0);
//! let b = g.scalar(-3.0);
//! let c = g.scalar(10.0);
//! let y = (a * b + c).tanh();
//! y.backward().unwrap();
//! assert!((y.item() - 0.9993293).abs() < 1e-6);
//! ```
//!
//! Gradients accumulate across backward passes and are never reset
//! implicitly; call [`Graph::zero_grad`] between evaluations that should not
//! compound.

pub mod autograd;
mod broadcast;
pub mod error;
pub mod graph;
mod op;
pub mod ops;

pub use error::TensorGradError;
pub use graph::{Graph, NodeId, Var};
