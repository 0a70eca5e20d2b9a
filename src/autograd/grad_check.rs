//! Finite-difference validation of analytical gradients.
//!
//! The checker rebuilds the graph from scratch for every perturbed
//! evaluation, so the function under test must be a pure recipe from leaf
//! ids to a terminal id. The scalar loss is `sum(output)`, matching the
//! all-ones seed used by the backward driver.

use ndarray::ArrayD;
use thiserror::Error;

use crate::error::TensorGradError;
use crate::graph::{Graph, NodeId};

/// Failures reported by [`check_gradients`].
#[derive(Error, Debug)]
pub enum GradCheckError {
    #[error("graph construction failed during gradient check: {0}")]
    Graph(#[from] TensorGradError),

    #[error(
        "gradient mismatch for input {input_index}, element {element_index}: \
         analytical {analytical} vs numerical {numerical} (difference {difference})"
    )]
    GradientMismatch {
        input_index: usize,
        element_index: usize,
        analytical: f64,
        numerical: f64,
        difference: f64,
    },

    #[error(
        "non-finite gradient for input {input_index}, element {element_index}: \
         analytical {analytical}, numerical {numerical}"
    )]
    NonFiniteGradient {
        input_index: usize,
        element_index: usize,
        analytical: f64,
        numerical: f64,
    },
}

/// Checks the analytical gradients of `build` against centered finite
/// differences.
///
/// `build` receives a fresh [`Graph`] whose first `inputs.len()` nodes are
/// leaves holding the given arrays, and returns the terminal node. Every
/// leaf element is perturbed by `±epsilon`; the numerical estimate of
/// `d sum(output) / d element` must match the accumulated gradient within
/// `tolerance` (absolute, with a relative fallback for large gradients).
pub fn check_gradients<F>(
    build: F,
    inputs: &[ArrayD<f64>],
    epsilon: f64,
    tolerance: f64,
) -> Result<(), GradCheckError>
where
    F: Fn(&Graph, &[NodeId]) -> Result<NodeId, TensorGradError>,
{
    let loss = |arrays: &[ArrayD<f64>]| -> Result<f64, TensorGradError> {
        let graph = Graph::new();
        let ids: Vec<NodeId> = arrays
            .iter()
            .map(|a| graph.value(a.clone()).id())
            .collect();
        let out = build(&graph, &ids)?;
        Ok(graph.data(out).sum())
    };

    // Analytical gradients from a single backward pass.
    let graph = Graph::new();
    let ids: Vec<NodeId> = inputs
        .iter()
        .map(|a| graph.value(a.clone()).id())
        .collect();
    let out = build(&graph, &ids)?;
    graph.backward(out)?;
    let analytical: Vec<ArrayD<f64>> = ids.iter().map(|&id| graph.grad(id)).collect();

    for (input_index, input) in inputs.iter().enumerate() {
        for (element_index, (idx, _)) in input.indexed_iter().enumerate() {
            let mut plus = inputs.to_vec();
            plus[input_index][idx.clone()] += epsilon;
            let mut minus = inputs.to_vec();
            minus[input_index][idx.clone()] -= epsilon;

            let numerical = (loss(&plus)? - loss(&minus)?) / (2.0 * epsilon);
            let analytical_value = analytical[input_index][idx.clone()];

            if !numerical.is_finite() || !analytical_value.is_finite() {
                return Err(GradCheckError::NonFiniteGradient {
                    input_index,
                    element_index,
                    analytical: analytical_value,
                    numerical,
                });
            }

            let difference = (analytical_value - numerical).abs();
            let scale = analytical_value.abs().max(numerical.abs()).max(1.0);
            if difference > tolerance * scale {
                return Err(GradCheckError::GradientMismatch {
                    input_index,
                    element_index,
                    analytical: analytical_value,
                    numerical,
                    difference,
                });
            }
        }
    }
    Ok(())
}
