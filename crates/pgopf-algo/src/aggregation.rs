//! Physics aggregation kernel.
//!
//! Stateless operations on per-bus real vectors in Cartesian voltage form
//! `V = e + jf`. One feature-construction step chains them:
//!
//! ```text
//! (pg, qg)       = compute_pg_qg(e, f, g, b, pd, qd)          full admittance
//! (pg, qg)       = apply_power_limits(pg, qg, limits)
//! (alpha, beta)  = compute_alpha_beta(e, f, g_nd, b_nd)       neighbours only
//! (delta, lambda)= compute_delta_lambda(pg, qg, pd, qd, e, f, g_diag, b_diag)
//! (e, f)         = aggregate_features(alpha, beta, delta, lambda)
//! (e, f)         = normalize_features(e, f)
//! ```
//!
//! Degenerate buses are not errors. A zero merge denominator or a zero
//! magnitude yields exactly `0` for both outputs at that bus.
//!
//! The elementwise operations are generic over the array dimension so the
//! convolution layer can apply them to `(batch, n_buses)` slices too.
//! Matrix products come in two shapes: `M·v` for a single vector and
//! `V·Mᵀ` for a batch of row vectors.

use ndarray::{Array, Array1, Array2, Dimension, Zip};

/// Bus injections from the Cartesian AC power-flow equations.
///
/// ```text
/// s1 = g·e - b·f      pg = pd + e∘s1 + f∘s2
/// s2 = g·f + b·e      qg = qd + f∘s1 - e∘s2
/// ```
///
/// `g`, `b` are the full (self + mutual) matrices. With zero admittance the
/// result is exactly `(pd, qd)`.
pub fn compute_pg_qg(
    e: &Array1<f64>,
    f: &Array1<f64>,
    g: &Array2<f64>,
    b: &Array2<f64>,
    pd: &Array1<f64>,
    qd: &Array1<f64>,
) -> (Array1<f64>, Array1<f64>) {
    let s1 = g.dot(e) - b.dot(f);
    let s2 = g.dot(f) + b.dot(e);

    let mut pg = pd.clone();
    let mut qg = qd.clone();
    Zip::from(&mut pg)
        .and(&mut qg)
        .and(e)
        .and(f)
        .and(&s1)
        .and(&s2)
        .for_each(|p, q, &e, &f, &s1, &s2| {
            *p += e * s1 + f * s2;
            *q += f * s1 - e * s2;
        });
    (pg, qg)
}

/// Per-bus generation bounds in per-unit.
#[derive(Debug, Clone)]
pub struct PowerLimits {
    pub pg_min: Array1<f64>,
    pub pg_max: Array1<f64>,
    pub qg_min: Array1<f64>,
    pub qg_max: Array1<f64>,
}

/// Elementwise clip of `pg` into `[pg_min, pg_max]` and `qg` into `[qg_min, qg_max]`.
///
/// The upper bound is applied first, then the lower, so an inverted pair
/// resolves to the lower bound. A NaN in any operand yields NaN.
pub fn apply_power_limits(
    pg: &Array1<f64>,
    qg: &Array1<f64>,
    limits: &PowerLimits,
) -> (Array1<f64>, Array1<f64>) {
    let clip = |v: f64, lo: f64, hi: f64| {
        if v.is_nan() || lo.is_nan() || hi.is_nan() {
            f64::NAN
        } else {
            v.min(hi).max(lo)
        }
    };
    let pg = Zip::from(pg)
        .and(&limits.pg_min)
        .and(&limits.pg_max)
        .map_collect(|&v, &lo, &hi| clip(v, lo, hi));
    let qg = Zip::from(qg)
        .and(&limits.qg_min)
        .and(&limits.qg_max)
        .map_collect(|&v, &lo, &hi| clip(v, lo, hi));
    (pg, qg)
}

/// Neighbourhood aggregation over the mutual admittance only.
///
/// ```text
/// alpha = g_nd·e - b_nd·f
/// beta  = g_nd·f + b_nd·e
/// ```
pub fn compute_alpha_beta(
    e: &Array1<f64>,
    f: &Array1<f64>,
    g_nd: &Array2<f64>,
    b_nd: &Array2<f64>,
) -> (Array1<f64>, Array1<f64>) {
    let alpha = g_nd.dot(e) - b_nd.dot(f);
    let beta = g_nd.dot(f) + b_nd.dot(e);
    (alpha, beta)
}

/// [`compute_alpha_beta`] for a batch of voltage rows, `(batch, n_buses)`.
pub fn compute_alpha_beta_batch(
    e: &Array2<f64>,
    f: &Array2<f64>,
    g_nd: &Array2<f64>,
    b_nd: &Array2<f64>,
) -> (Array2<f64>, Array2<f64>) {
    let alpha = e.dot(&g_nd.t()) - f.dot(&b_nd.t());
    let beta = f.dot(&g_nd.t()) + e.dot(&b_nd.t());
    (alpha, beta)
}

/// Residual power balance attributable to the self admittance.
///
/// ```text
/// v2     = e² + f²
/// delta  = pg - pd - v2∘diag(g_diag)
/// lambda = qg - qd + v2∘diag(b_diag)
/// ```
#[allow(clippy::too_many_arguments)]
pub fn compute_delta_lambda(
    pg: &Array1<f64>,
    qg: &Array1<f64>,
    pd: &Array1<f64>,
    qd: &Array1<f64>,
    e: &Array1<f64>,
    f: &Array1<f64>,
    g_diag: &Array2<f64>,
    b_diag: &Array2<f64>,
) -> (Array1<f64>, Array1<f64>) {
    let v2 = squared_magnitude(e, f);
    let g_self = g_diag.diag();
    let b_self = b_diag.diag();

    let delta = Zip::from(pg)
        .and(pd)
        .and(&v2)
        .and(&g_self)
        .map_collect(|&pg, &pd, &v2, &g| pg - pd - v2 * g);
    let lambda = Zip::from(qg)
        .and(qd)
        .and(&v2)
        .and(&b_self)
        .map_collect(|&qg, &qd, &v2, &b| qg - qd + v2 * b);
    (delta, lambda)
}

/// Self terms seen by the convolution layer, which knows demand but not
/// generation:
///
/// ```text
/// delta  = -pd - v2∘diag(g_diag)
/// lambda = -qd - v2∘diag(b_diag)
/// ```
///
/// `e`, `f` may be a single `(n_buses,)` vector or a `(batch, n_buses)`
/// slice; `pd`, `qd` and the diagonals broadcast along the bus axis.
pub fn compute_demand_delta_lambda<D: Dimension>(
    pd: &Array1<f64>,
    qd: &Array1<f64>,
    e: &Array<f64, D>,
    f: &Array<f64, D>,
    g_diag: &Array2<f64>,
    b_diag: &Array2<f64>,
) -> (Array<f64, D>, Array<f64, D>) {
    let v2 = squared_magnitude(e, f);
    let g_self = g_diag.diag();
    let b_self = b_diag.diag();

    let delta = Zip::from(&v2)
        .and_broadcast(pd)
        .and_broadcast(&g_self)
        .map_collect(|&v2, &pd, &g| -pd - v2 * g);
    let lambda = Zip::from(&v2)
        .and_broadcast(qd)
        .and_broadcast(&b_self)
        .map_collect(|&v2, &qd, &b| -qd - v2 * b);
    (delta, lambda)
}

/// Gauss-Seidel merge: per bus, `(delta + j·lambda) / (alpha - j·beta)`.
///
/// ```text
/// denom = alpha² + beta²
/// e_new = (delta·alpha - lambda·beta) / denom
/// f_new = (delta·beta + lambda·alpha) / denom
/// ```
///
/// Buses with `denom == 0` get `e_new = f_new = 0` whatever `delta`, `lambda` hold.
pub fn aggregate_features<D: Dimension>(
    alpha: &Array<f64, D>,
    beta: &Array<f64, D>,
    delta: &Array<f64, D>,
    lambda: &Array<f64, D>,
) -> (Array<f64, D>, Array<f64, D>) {
    let mut e_new = Array::zeros(alpha.raw_dim());
    let mut f_new = Array::zeros(alpha.raw_dim());
    Zip::from(&mut e_new)
        .and(&mut f_new)
        .and(alpha)
        .and(beta)
        .and(delta)
        .and(lambda)
        .for_each(|e, f, &a, &b, &d, &l| {
            let denom = a * a + b * b;
            if denom != 0.0 {
                *e = (d * a - l * b) / denom;
                *f = (d * b + l * a) / denom;
            }
        });
    (e_new, f_new)
}

/// Project `(e, f)` onto the unit circle; `(0, 0)` stays `(0, 0)`.
pub fn normalize_features<D: Dimension>(
    e: &Array<f64, D>,
    f: &Array<f64, D>,
) -> (Array<f64, D>, Array<f64, D>) {
    let mut e_norm = Array::zeros(e.raw_dim());
    let mut f_norm = Array::zeros(e.raw_dim());
    Zip::from(&mut e_norm)
        .and(&mut f_norm)
        .and(e)
        .and(f)
        .for_each(|en, fn_, &e, &f| {
            let mag = (e * e + f * f).sqrt();
            if mag != 0.0 {
                *en = e / mag;
                *fn_ = f / mag;
            }
        });
    (e_norm, f_norm)
}

fn squared_magnitude<D: Dimension>(e: &Array<f64, D>, f: &Array<f64, D>) -> Array<f64, D> {
    Zip::from(e).and(f).map_collect(|&e, &f| e * e + f * f)
}
