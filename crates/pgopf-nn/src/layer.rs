//! Physics-guided graph convolution.
//!
//! The layer reads the most recent voltage iterate from its input channels
//! (`e = X[:, mid-1]`, `f = X[:, in-1]` with `mid = in/2`) and recomputes the
//! neighbourhood and self terms of the aggregation kernel against the
//! network's admittance and demand:
//!
//! ```text
//! alpha, beta    = g_nd·e - b_nd·f, g_nd·f + b_nd·e
//! delta, lambda  = -pd - v2∘diag(g_diag), -qd - v2∘diag(b_diag)
//! phi_e, phi_f   = merge(alpha, beta, delta, lambda)
//! ```
//!
//! `phi_e`/`phi_f` are computed on every forward pass but the trainable path
//! does not read them:
//!
//! ```text
//! Y = tanh(((X[:, :mid]·W1 + B1) + (X[:, mid:]·W2 + B2)) / 2)
//! ```
//!
//! Stacked layers keep using the original network's physics parameters; the
//! channels of a hidden layer are learned features, not voltage history.

use ndarray::{s, Array1, Array2, Array3, ArrayView2, Axis};
use pgopf_algo::{
    aggregate_features, compute_alpha_beta, compute_alpha_beta_batch,
    compute_demand_delta_lambda, PhysicsParams,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{NnError, NnResult};
use crate::init::{xavier_uniform, TANH_GAIN};

/// Trainable parameters of one [`PhysicsGuidedConv`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvParameters {
    /// `(in/2, out)`, applied to the e-half of the input
    pub w1: Array2<f64>,
    /// `(in/2, out)`, applied to the f-half of the input
    pub w2: Array2<f64>,
    pub b1: Array1<f64>,
    pub b2: Array1<f64>,
}

#[derive(Debug, Clone)]
pub struct PhysicsGuidedConv {
    in_channels: usize,
    out_channels: usize,
    params: ConvParameters,
}

impl PhysicsGuidedConv {
    /// Xavier-uniform weights (tanh gain), zero biases.
    pub fn new<R: Rng + ?Sized>(
        in_channels: usize,
        out_channels: usize,
        rng: &mut R,
    ) -> NnResult<Self> {
        validate_channels(in_channels, out_channels)?;
        let half = in_channels / 2;
        let params = ConvParameters {
            w1: xavier_uniform(half, out_channels, TANH_GAIN, rng),
            w2: xavier_uniform(half, out_channels, TANH_GAIN, rng),
            b1: Array1::zeros(out_channels),
            b2: Array1::zeros(out_channels),
        };
        Ok(Self {
            in_channels,
            out_channels,
            params,
        })
    }

    /// Rebuild a layer from previously stored parameters.
    pub fn from_parameters(params: ConvParameters) -> NnResult<Self> {
        let (half, out) = params.w1.dim();
        validate_channels(2 * half, out)?;
        if params.w2.dim() != (half, out) {
            return Err(NnError::shape("w2", (half, out), params.w2.dim()));
        }
        if params.b1.len() != out {
            return Err(NnError::shape("b1", out, params.b1.len()));
        }
        if params.b2.len() != out {
            return Err(NnError::shape("b2", out, params.b2.len()));
        }
        Ok(Self {
            in_channels: 2 * half,
            out_channels: out,
            params,
        })
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn parameters(&self) -> &ConvParameters {
        &self.params
    }

    pub fn parameter_count(&self) -> usize {
        self.params.w1.len() + self.params.w2.len() + self.params.b1.len() + self.params.b2.len()
    }

    /// `(phi_e, phi_f)` for a single `(n_buses, in_channels)` sample.
    pub fn physics_terms(
        &self,
        x: &Array2<f64>,
        physics: &PhysicsParams<'_>,
    ) -> NnResult<(Array1<f64>, Array1<f64>)> {
        self.check_input(x.dim(), physics)?;
        let mid = self.in_channels / 2;
        let e = x.column(mid - 1).to_owned();
        let f = x.column(self.in_channels - 1).to_owned();

        let (alpha, beta) = compute_alpha_beta(&e, &f, physics.g_nd, physics.b_nd);
        let (delta, lambda) = compute_demand_delta_lambda(
            physics.pd,
            physics.qd,
            &e,
            &f,
            physics.g_diag,
            physics.b_diag,
        );
        Ok(aggregate_features(&alpha, &beta, &delta, &lambda))
    }

    /// `(phi_e, phi_f)` for a `(batch, n_buses, in_channels)` input, each `(batch, n_buses)`.
    pub fn physics_terms_batch(
        &self,
        x: &Array3<f64>,
        physics: &PhysicsParams<'_>,
    ) -> NnResult<(Array2<f64>, Array2<f64>)> {
        let (_, n, c) = x.dim();
        self.check_input((n, c), physics)?;
        let mid = self.in_channels / 2;
        let e = x.index_axis(Axis(2), mid - 1).to_owned();
        let f = x.index_axis(Axis(2), self.in_channels - 1).to_owned();

        let (alpha, beta) = compute_alpha_beta_batch(&e, &f, physics.g_nd, physics.b_nd);
        let (delta, lambda) = compute_demand_delta_lambda(
            physics.pd,
            physics.qd,
            &e,
            &f,
            physics.g_diag,
            physics.b_diag,
        );
        Ok(aggregate_features(&alpha, &beta, &delta, &lambda))
    }

    /// `(n_buses, in_channels)` to `(n_buses, out_channels)`, values in `[-1, 1]`.
    pub fn forward(&self, x: &Array2<f64>, physics: &PhysicsParams<'_>) -> NnResult<Array2<f64>> {
        // Not consumed by the linear path below.
        let _phi = self.physics_terms(x, physics)?;
        Ok(self.linear_path(x.view()))
    }

    /// `(batch, n_buses, in_channels)` to `(batch, n_buses, out_channels)`.
    pub fn forward_batch(
        &self,
        x: &Array3<f64>,
        physics: &PhysicsParams<'_>,
    ) -> NnResult<Array3<f64>> {
        let _phi = self.physics_terms_batch(x, physics)?;
        let (batch, n, _) = x.dim();
        let mut out = Array3::zeros((batch, n, self.out_channels));
        for (sample, mut slot) in x.outer_iter().zip(out.outer_iter_mut()) {
            slot.assign(&self.linear_path(sample));
        }
        Ok(out)
    }

    fn linear_path(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let mid = self.in_channels / 2;
        let ConvParameters { w1, w2, b1, b2 } = &self.params;
        let out_e = x.slice(s![.., ..mid]).dot(w1) + b1;
        let out_f = x.slice(s![.., mid..]).dot(w2) + b2;
        ((out_e + out_f) / 2.0).mapv_into(f64::tanh)
    }

    fn check_input(&self, (n, c): (usize, usize), physics: &PhysicsParams<'_>) -> NnResult<()> {
        if c != self.in_channels {
            return Err(NnError::shape("input channels", self.in_channels, c));
        }
        validate_physics(physics, n)
    }
}

fn validate_channels(in_channels: usize, out_channels: usize) -> NnResult<()> {
    if in_channels == 0 || out_channels == 0 {
        return Err(NnError::Config(format!(
            "channel counts must be positive (in={in_channels}, out={out_channels})"
        )));
    }
    if in_channels % 2 != 0 {
        return Err(NnError::Config(format!(
            "in_channels must be even to split into e/f halves, got {in_channels}"
        )));
    }
    Ok(())
}

/// Every physics tensor must agree with the bus count of the input.
pub(crate) fn validate_physics(physics: &PhysicsParams<'_>, n_buses: usize) -> NnResult<()> {
    if physics.pd.len() != n_buses {
        return Err(NnError::shape("pd", n_buses, physics.pd.len()));
    }
    if physics.qd.len() != n_buses {
        return Err(NnError::shape("qd", n_buses, physics.qd.len()));
    }
    for (what, m) in [
        ("g_diag", physics.g_diag),
        ("b_diag", physics.b_diag),
        ("g_nd", physics.g_nd),
        ("b_nd", physics.b_nd),
    ] {
        if m.dim() != (n_buses, n_buses) {
            return Err(NnError::shape(what, (n_buses, n_buses), m.dim()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::{rngs::StdRng, SeedableRng};

    struct Physics {
        pd: Array1<f64>,
        qd: Array1<f64>,
        g_diag: Array2<f64>,
        b_diag: Array2<f64>,
        g_nd: Array2<f64>,
        b_nd: Array2<f64>,
    }

    impl Physics {
        fn three_bus() -> Self {
            Self {
                pd: array![0.0, 0.5, 0.3],
                qd: array![0.0, 0.1, 0.05],
                g_diag: Array2::from_diag(&array![2.0, 1.5, 1.5]),
                b_diag: Array2::from_diag(&array![-9.5, -7.0, -6.4]),
                g_nd: array![[0.0, -1.0, -1.0], [-1.0, 0.0, -0.5], [-1.0, -0.5, 0.0]],
                b_nd: array![[0.0, 5.0, 4.5], [5.0, 0.0, 2.0], [4.5, 2.0, 0.0]],
            }
        }

        fn params(&self) -> PhysicsParams<'_> {
            PhysicsParams {
                pd: &self.pd,
                qd: &self.qd,
                g_diag: &self.g_diag,
                b_diag: &self.b_diag,
                g_nd: &self.g_nd,
                b_nd: &self.b_nd,
            }
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_rejects_bad_channels() {
        assert!(matches!(
            PhysicsGuidedConv::new(0, 8, &mut rng()),
            Err(NnError::Config(_))
        ));
        assert!(matches!(
            PhysicsGuidedConv::new(8, 0, &mut rng()),
            Err(NnError::Config(_))
        ));
        assert!(matches!(
            PhysicsGuidedConv::new(7, 8, &mut rng()),
            Err(NnError::Config(_))
        ));
    }

    #[test]
    fn test_init_shapes_and_zero_bias() {
        let layer = PhysicsGuidedConv::new(8, 6, &mut rng()).unwrap();
        let p = layer.parameters();
        assert_eq!(p.w1.dim(), (4, 6));
        assert_eq!(p.w2.dim(), (4, 6));
        assert!(p.b1.iter().chain(p.b2.iter()).all(|&b| b == 0.0));
        assert_eq!(layer.parameter_count(), 60);
    }

    #[test]
    fn test_known_weights() {
        // in=2, out=1: y = tanh(((x0*w1 + b1) + (x1*w2 + b2)) / 2)
        let layer = PhysicsGuidedConv::from_parameters(ConvParameters {
            w1: array![[0.5]],
            w2: array![[-1.0]],
            b1: array![0.1],
            b2: array![0.3],
        })
        .unwrap();
        let physics = Physics {
            pd: array![0.2],
            qd: array![0.1],
            g_diag: array![[1.0]],
            b_diag: array![[-2.0]],
            g_nd: array![[0.0]],
            b_nd: array![[0.0]],
        };
        let y = layer.forward(&array![[2.0, 0.4]], &physics.params()).unwrap();
        let expected = (((2.0 * 0.5 + 0.1) + (0.4 * -1.0 + 0.3)) / 2.0_f64).tanh();
        assert!((y[[0, 0]] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_physics_terms_use_latest_iterate() {
        let physics = Physics::three_bus();
        let layer = PhysicsGuidedConv::new(4, 2, &mut rng()).unwrap();
        // Columns: e0, e1, f0, f1. Only e1 and f1 should matter.
        let x = array![[9.0, 1.0, 9.0, 0.0], [9.0, 0.9, 9.0, 0.1], [9.0, 1.1, 9.0, -0.1]];
        let (phi_e, phi_f) = layer.physics_terms(&x, &physics.params()).unwrap();

        let e = array![1.0, 0.9, 1.1];
        let f = array![0.0, 0.1, -0.1];
        let (alpha, beta) = compute_alpha_beta(&e, &f, &physics.g_nd, &physics.b_nd);
        let v2 = &e * &e + &f * &f;
        let delta = -&physics.pd - &v2 * &physics.g_diag.diag();
        let lambda = -&physics.qd - &v2 * &physics.b_diag.diag();
        for i in 0..3 {
            let denom = alpha[i] * alpha[i] + beta[i] * beta[i];
            let exp_e = (delta[i] * alpha[i] - lambda[i] * beta[i]) / denom;
            let exp_f = (delta[i] * beta[i] + lambda[i] * alpha[i]) / denom;
            assert!((phi_e[i] - exp_e).abs() < 1e-12);
            assert!((phi_f[i] - exp_f).abs() < 1e-12);
        }
    }

    #[test]
    fn test_output_ignores_physics_values() {
        let layer = PhysicsGuidedConv::new(4, 3, &mut rng()).unwrap();
        let x = array![[1.0, 0.8, 0.0, 0.2], [1.0, 0.7, 0.0, -0.3], [1.0, 1.0, 0.0, 0.0]];
        let a = Physics::three_bus();
        let mut b = Physics::three_bus();
        b.pd *= 10.0;
        b.g_nd *= -3.0;
        let ya = layer.forward(&x, &a.params()).unwrap();
        let yb = layer.forward(&x, &b.params()).unwrap();
        assert_eq!(ya, yb);
    }

    #[test]
    fn test_shape_errors() {
        let physics = Physics::three_bus();
        let layer = PhysicsGuidedConv::new(4, 2, &mut rng()).unwrap();
        let wrong_channels = Array2::zeros((3, 6));
        assert!(matches!(
            layer.forward(&wrong_channels, &physics.params()),
            Err(NnError::Shape { what: "input channels", .. })
        ));
        let wrong_buses = Array2::zeros((2, 4));
        assert!(matches!(
            layer.forward(&wrong_buses, &physics.params()),
            Err(NnError::Shape { what: "pd", .. })
        ));
    }

    #[test]
    fn test_from_parameters_checks_shapes() {
        let err = PhysicsGuidedConv::from_parameters(ConvParameters {
            w1: Array2::zeros((2, 3)),
            w2: Array2::zeros((3, 3)),
            b1: Array1::zeros(3),
            b2: Array1::zeros(3),
        })
        .unwrap_err();
        assert!(err.to_string().contains("w2"));
    }
}
