//! The operation library.
//!
//! Each submodule defines named `*_op` forward functions: they validate
//! shapes, compute the forward payload, and push a tagged node onto the
//! graph. The corresponding local-derivative rules are dispatched from a
//! single function in [`crate::autograd`]. The `std::ops` operator impls on
//! [`Var`] are convenience sugar over the same registration contract and
//! panic on shape or graph mismatch; use the named functions where errors
//! must be handled.

pub mod activation;
pub mod arithmetic;
pub mod linalg;
pub mod math_elem;
pub mod reduction;

pub use activation::{relu_op, tanh_op};
pub use arithmetic::{add_op, div_op, mul_op, neg_op, pow_op, sub_op};
pub use linalg::matmul_op;
pub use math_elem::{exp_op, log_op};
pub use reduction::{sum_axis_op, sum_op};

use crate::error::TensorGradError;
use crate::graph::Var;

impl<'g> Var<'g> {
    /// Elementwise power with a fixed real exponent.
    pub fn pow(self, exponent: f64) -> Var<'g> {
        self.graph.var(pow_op(self.graph, self.id, exponent))
    }

    /// 2-D matrix product.
    pub fn matmul(self, rhs: Var<'g>) -> Result<Var<'g>, TensorGradError> {
        self.same_graph(&rhs)?;
        Ok(self.graph.var(matmul_op(self.graph, self.id, rhs.id)?))
    }

    /// Elementwise `max(x, 0)`.
    pub fn relu(self) -> Var<'g> {
        self.graph.var(relu_op(self.graph, self.id))
    }

    /// Elementwise exponential.
    pub fn exp(self) -> Var<'g> {
        self.graph.var(exp_op(self.graph, self.id))
    }

    /// Elementwise natural logarithm. Non-positive inputs produce non-finite
    /// values that propagate per floating-point semantics.
    pub fn log(self) -> Var<'g> {
        self.graph.var(log_op(self.graph, self.id))
    }

    /// Elementwise hyperbolic tangent.
    pub fn tanh(self) -> Var<'g> {
        self.graph.var(tanh_op(self.graph, self.id))
    }

    /// Total of all elements as a 0-d scalar.
    pub fn sum(self) -> Var<'g> {
        self.graph.var(sum_op(self.graph, self.id))
    }

    /// Sum along one axis.
    pub fn sum_axis(self, axis: usize, keepdims: bool) -> Result<Var<'g>, TensorGradError> {
        Ok(self
            .graph
            .var(sum_axis_op(self.graph, self.id, axis, keepdims)?))
    }
}

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $op_fn:ident) => {
        impl<'g> std::ops::$trait for Var<'g> {
            type Output = Var<'g>;
            fn $method(self, rhs: Var<'g>) -> Var<'g> {
                if let Err(e) = self.same_graph(&rhs) {
                    panic!("{e}");
                }
                match $op_fn(self.graph, self.id, rhs.id) {
                    Ok(id) => self.graph.var(id),
                    Err(e) => panic!("{e}"),
                }
            }
        }

        impl<'g> std::ops::$trait<f64> for Var<'g> {
            type Output = Var<'g>;
            fn $method(self, rhs: f64) -> Var<'g> {
                let rhs = self.graph.scalar(rhs);
                std::ops::$trait::$method(self, rhs)
            }
        }

        impl<'g> std::ops::$trait<Var<'g>> for f64 {
            type Output = Var<'g>;
            fn $method(self, rhs: Var<'g>) -> Var<'g> {
                let lhs = rhs.graph.scalar(self);
                std::ops::$trait::$method(lhs, rhs)
            }
        }
    };
}

binary_operator!(Add, add, add_op);
binary_operator!(Sub, sub, sub_op);
binary_operator!(Mul, mul, mul_op);
binary_operator!(Div, div, div_op);

impl<'g> std::ops::Neg for Var<'g> {
    type Output = Var<'g>;
    fn neg(self) -> Var<'g> {
        self.graph.var(neg_op(self.graph, self.id))
    }
}
