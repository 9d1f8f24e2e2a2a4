//! Probabilistic accuracy of `[pg, vm]` predictions.
//!
//! A bus counts as a hit for a channel when the absolute error is strictly
//! below that channel's threshold. Every bus in every scenario contributes to
//! the denominator, generator or not.

use ndarray::{Array, Axis, Dimension, Zip};
use serde::Serialize;

use crate::error::{NnError, NnResult};
use crate::losses::supervised_mse;

/// Split-level scores. Shares are in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccuracyReport {
    pub loss: f64,
    pub pg: f64,
    pub vg: f64,
    /// Both channels within threshold at the same bus
    pub joint: f64,
    pub samples: usize,
}

/// Score predictions against targets whose last axis is `[pg, vm]`.
///
/// Works for a single scenario `(n_buses, 2)` or a batch
/// `(batch, n_buses, 2)`.
pub fn probabilistic_accuracy<D: Dimension>(
    pred: &Array<f64, D>,
    target: &Array<f64, D>,
    pg_threshold: f64,
    vg_threshold: f64,
) -> NnResult<AccuracyReport> {
    if pred.shape() != target.shape() {
        return Err(NnError::shape("target", pred.shape(), target.shape()));
    }
    let channels = pred.shape().last().copied().unwrap_or(0);
    if pred.ndim() < 2 || channels != 2 {
        return Err(NnError::shape("prediction", "(.., 2)", pred.shape()));
    }
    if !(pg_threshold > 0.0 && vg_threshold > 0.0) {
        return Err(NnError::Config(format!(
            "accuracy thresholds must be positive, got pg={pg_threshold} vg={vg_threshold}"
        )));
    }

    let loss = supervised_mse(pred, target)?;
    let axis = Axis(pred.ndim() - 1);
    let (pg_hits, vg_hits, joint_hits) = Zip::from(pred.lanes(axis))
        .and(target.lanes(axis))
        .fold((0usize, 0usize, 0usize), |(pg, vg, joint), p, t| {
            let pg_ok = (p[0] - t[0]).abs() < pg_threshold;
            let vg_ok = (p[1] - t[1]).abs() < vg_threshold;
            (
                pg + usize::from(pg_ok),
                vg + usize::from(vg_ok),
                joint + usize::from(pg_ok && vg_ok),
            )
        });

    let samples = pred.len() / 2;
    let share = |hits: usize| hits as f64 / samples as f64;
    Ok(AccuracyReport {
        loss,
        pg: share(pg_hits),
        vg: share(vg_hits),
        joint: share(joint_hits),
        samples,
    })
}
