//! Training objectives, evaluated as plain values.
//!
//! The correlative term ties predicted generation to predicted voltage
//! magnitude through the power-flow equations under a flat-angle assumption
//! (`e = |V|`, `f = 0`):
//!
//! ```text
//! pg_calc = pd + e∘((g_diag + g_nd)·e)
//! loss    = mean((pg_pred - pg_calc)²)
//! ```

use ndarray::{Array, Array1, Array2, Dimension, Zip};
use pgopf_algo::{compute_pg_qg, PhysicsParams};

use crate::error::{NnError, NnResult};
use crate::layer::validate_physics;

/// Mean squared error over all elements.
pub fn supervised_mse<D: Dimension>(
    pred: &Array<f64, D>,
    target: &Array<f64, D>,
) -> NnResult<f64> {
    if pred.shape() != target.shape() {
        return Err(NnError::shape("target", pred.shape(), target.shape()));
    }
    if pred.is_empty() {
        return Err(NnError::shape("prediction", "non-empty", pred.shape()));
    }
    let sum = Zip::from(pred)
        .and(target)
        .fold(0.0, |acc, &p, &t| acc + (p - t) * (p - t));
    Ok(sum / pred.len() as f64)
}

/// Active generation implied by voltage magnitudes at zero angle.
pub fn implied_pg(v_pred: &Array1<f64>, physics: &PhysicsParams<'_>) -> NnResult<Array1<f64>> {
    validate_physics(physics, v_pred.len())?;
    let g_full = physics.g_diag + physics.g_nd;
    let b_full = physics.b_diag + physics.b_nd;
    let f = Array1::zeros(v_pred.len());
    let (pg, _) = compute_pg_qg(v_pred, &f, &g_full, &b_full, physics.pd, physics.qd);
    Ok(pg)
}

pub fn correlative_pg_loss(
    pg_pred: &Array1<f64>,
    v_pred: &Array1<f64>,
    physics: &PhysicsParams<'_>,
) -> NnResult<f64> {
    let pg_calc = implied_pg(v_pred, physics)?;
    supervised_mse(pg_pred, &pg_calc)
}

/// Batched form over `(batch, n_buses)` rows.
pub fn correlative_pg_loss_batch(
    pg_pred: &Array2<f64>,
    v_pred: &Array2<f64>,
    physics: &PhysicsParams<'_>,
) -> NnResult<f64> {
    if pg_pred.dim() != v_pred.dim() {
        return Err(NnError::shape("v_pred", pg_pred.dim(), v_pred.dim()));
    }
    let mut total = 0.0;
    for (pg_row, v_row) in pg_pred.outer_iter().zip(v_pred.outer_iter()) {
        total += correlative_pg_loss(&pg_row.to_owned(), &v_row.to_owned(), physics)?;
    }
    // Rows have equal length, so the mean of row means is the overall mean.
    Ok(total / pg_pred.nrows().max(1) as f64)
}

/// `supervised_mse(pred, target) + kappa * correlative_pg_loss(pred[:, 0], v_pred)`.
///
/// `pred` and `target` are `(n_buses, output_dim)` with active generation in
/// column 0.
pub fn combined_loss(
    pred: &Array2<f64>,
    target: &Array2<f64>,
    v_pred: &Array1<f64>,
    physics: &PhysicsParams<'_>,
    kappa: f64,
) -> NnResult<f64> {
    let supervised = supervised_mse(pred, target)?;
    if pred.ncols() == 0 {
        return Err(NnError::shape("prediction columns", "at least 1", 0));
    }
    let pg_pred = pred.column(0).to_owned();
    let correlative = correlative_pg_loss(&pg_pred, v_pred, physics)?;
    Ok(supervised + kappa * correlative)
}
