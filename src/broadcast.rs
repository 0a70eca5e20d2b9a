//! Broadcasting helpers: forward co-broadcasting of operand pairs and the
//! backward reduction of gradients to each operand's original shape.

use ndarray::{ArrayD, Axis, IxDyn, Zip};

use crate::error::TensorGradError;

/// Output shape of broadcasting `shape_a` against `shape_b`.
///
/// Standard elementwise rules: shapes are aligned at the trailing dimension,
/// missing leading dimensions count as size 1, and a size-1 dimension
/// stretches to the other operand's size.
pub(crate) fn broadcast_shapes(
    shape_a: &[usize],
    shape_b: &[usize],
) -> Result<Vec<usize>, TensorGradError> {
    let rank = shape_a.len().max(shape_b.len());
    let mut result = vec![0; rank];
    for i in 0..rank {
        let dim_a = shape_a
            .get(shape_a.len().wrapping_sub(1 + i))
            .copied()
            .unwrap_or(1);
        let dim_b = shape_b
            .get(shape_b.len().wrapping_sub(1 + i))
            .copied()
            .unwrap_or(1);
        result[rank - 1 - i] = if dim_a == dim_b {
            dim_a
        } else if dim_a == 1 {
            dim_b
        } else if dim_b == 1 {
            dim_a
        } else {
            return Err(TensorGradError::BroadcastError {
                shape1: shape_a.to_vec(),
                shape2: shape_b.to_vec(),
            });
        };
    }
    Ok(result)
}

/// Applies `f` elementwise over both operands broadcast to their common
/// shape, allocating the result.
pub(crate) fn broadcast_zip<F>(
    a: &ArrayD<f64>,
    b: &ArrayD<f64>,
    f: F,
) -> Result<ArrayD<f64>, TensorGradError>
where
    F: Fn(f64, f64) -> f64,
{
    let shape = broadcast_shapes(a.shape(), b.shape())?;
    let av = a.broadcast(IxDyn(&shape)).ok_or_else(|| {
        TensorGradError::InternalError(format!(
            "broadcast of {:?} to computed shape {:?} failed",
            a.shape(),
            shape
        ))
    })?;
    let bv = b.broadcast(IxDyn(&shape)).ok_or_else(|| {
        TensorGradError::InternalError(format!(
            "broadcast of {:?} to computed shape {:?} failed",
            b.shape(),
            shape
        ))
    })?;
    Ok(Zip::from(&av).and(&bv).map_collect(|&x, &y| f(x, y)))
}

/// Reduces a gradient carried at the broadcast output shape back down to an
/// operand's original shape.
///
/// Sums over every leading axis the operand lacked, then over every axis
/// where the operand's size was 1 but the gradient's is greater (keeping
/// that axis at size 1). The axes are derived purely from shape comparison;
/// the result shape must equal `target` exactly.
pub(crate) fn reduce_grad(
    grad: &ArrayD<f64>,
    target: &[usize],
) -> Result<ArrayD<f64>, TensorGradError> {
    if grad.shape() == target {
        return Ok(grad.clone());
    }
    let mut reduced = grad.clone();
    while reduced.ndim() > target.len() {
        reduced = reduced.sum_axis(Axis(0));
    }
    for (i, &dim) in target.iter().enumerate() {
        if dim == 1 && reduced.shape()[i] != 1 {
            reduced = reduced.sum_axis(Axis(i)).insert_axis(Axis(i));
        }
    }
    if reduced.shape() != target {
        return Err(TensorGradError::InternalError(format!(
            "gradient reduction from {:?} produced {:?}, expected {:?}",
            grad.shape(),
            reduced.shape(),
            target
        )));
    }
    Ok(reduced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr0;

    #[test]
    fn broadcast_shapes_aligns_trailing_dims() {
        assert_eq!(broadcast_shapes(&[2, 3], &[2, 3]).unwrap(), vec![2, 3]);
        assert_eq!(broadcast_shapes(&[1, 3], &[2, 3]).unwrap(), vec![2, 3]);
        assert_eq!(broadcast_shapes(&[3], &[2, 3]).unwrap(), vec![2, 3]);
        assert_eq!(broadcast_shapes(&[], &[4, 2]).unwrap(), vec![4, 2]);
        assert_eq!(
            broadcast_shapes(&[2, 1, 5], &[3, 1]).unwrap(),
            vec![2, 3, 5]
        );
    }

    #[test]
    fn broadcast_shapes_rejects_mismatch() {
        let err = broadcast_shapes(&[2, 2], &[2, 3]).unwrap_err();
        assert_eq!(
            err,
            TensorGradError::BroadcastError {
                shape1: vec![2, 2],
                shape2: vec![2, 3],
            }
        );
    }

    #[test]
    fn broadcast_zip_stretches_both_operands() {
        let a = ArrayD::from_shape_vec(IxDyn(&[1, 3]), vec![1.0, 2.0, 3.0]).unwrap();
        let b = ArrayD::from_shape_vec(IxDyn(&[2, 1]), vec![10.0, 20.0]).unwrap();
        let out = broadcast_zip(&a, &b, |x, y| x + y).unwrap();
        assert_eq!(out.shape(), &[2, 3]);
        assert_eq!(
            out.into_raw_vec_and_offset().0,
            vec![11.0, 12.0, 13.0, 21.0, 22.0, 23.0]
        );
    }

    #[test]
    fn reduce_grad_sums_stretched_axes() {
        let grad =
            ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let reduced = reduce_grad(&grad, &[1, 3]).unwrap();
        assert_eq!(reduced.shape(), &[1, 3]);
        assert_eq!(reduced.into_raw_vec_and_offset().0, vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn reduce_grad_sums_missing_leading_axes() {
        let grad =
            ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let reduced = reduce_grad(&grad, &[3]).unwrap();
        assert_eq!(reduced.shape(), &[3]);
        assert_eq!(reduced.into_raw_vec_and_offset().0, vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn reduce_grad_to_scalar_sums_everything() {
        let grad =
            ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let reduced = reduce_grad(&grad, &[]).unwrap();
        assert_eq!(reduced, arr0(10.0).into_dyn());
    }

    #[test]
    fn reduce_grad_is_identity_on_matching_shapes() {
        let grad = ArrayD::from_shape_vec(IxDyn(&[2]), vec![1.5, 2.5]).unwrap();
        assert_eq!(reduce_grad(&grad, &[2]).unwrap(), grad);
    }
}
