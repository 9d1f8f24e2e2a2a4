//! Admittance decomposition into self (diagonal) and mutual (off-diagonal)
//! conductance and susceptance.
//!
//! ```text
//! g = Re(Y)   g_diag = diag(diag(g))   g_nd = g - g_diag
//! b = Im(Y)   b_diag = diag(diag(b))   b_nd = b - b_diag
//! ```
//!
//! The split is a lossless partition: `g_diag + g_nd` reproduces `Re(Y)`
//! exactly, and likewise for the susceptance.

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use pgopf_core::Network;
use serde::Serialize;

use crate::ybus::{SparseYBus, YBusError};

#[derive(Debug, Clone, Serialize)]
pub struct AdmittanceComponents {
    pub g_diag: Array2<f64>,
    pub b_diag: Array2<f64>,
    pub g_nd: Array2<f64>,
    pub b_nd: Array2<f64>,
    pub base_mva: f64,
}

impl AdmittanceComponents {
    /// Build the Y-bus of `network` and decompose it.
    ///
    /// Fails if the Y-bus cannot be built; no defaults are substituted.
    pub fn from_network(network: &Network) -> Result<Self, YBusError> {
        let ybus = SparseYBus::from_network(network)?;
        Ok(Self::from_dense(&ybus.to_dense(), network.base_mva.value()))
    }

    /// Decompose an already dense complex admittance matrix.
    pub fn from_dense(ybus: &Array2<Complex64>, base_mva: f64) -> Self {
        let g = ybus.mapv(|y| y.re);
        let b = ybus.mapv(|y| y.im);
        let g_diag = Array2::from_diag(&g.diag());
        let b_diag = Array2::from_diag(&b.diag());
        let g_nd = &g - &g_diag;
        let b_nd = &b - &b_diag;
        Self {
            g_diag,
            b_diag,
            g_nd,
            b_nd,
            base_mva,
        }
    }

    pub fn n_buses(&self) -> usize {
        self.g_diag.nrows()
    }

    /// Full conductance `g_diag + g_nd`.
    pub fn g_full(&self) -> Array2<f64> {
        &self.g_diag + &self.g_nd
    }

    /// Full susceptance `b_diag + b_nd`.
    pub fn b_full(&self) -> Array2<f64> {
        &self.b_diag + &self.b_nd
    }

    /// Self-conductance per bus.
    pub fn g_self(&self) -> Array1<f64> {
        self.g_diag.diag().to_owned()
    }

    /// Self-susceptance per bus.
    pub fn b_self(&self) -> Array1<f64> {
        self.b_diag.diag().to_owned()
    }
}

/// Shorthand for [`AdmittanceComponents::from_network`].
pub fn extract_admittance_components(
    network: &Network,
) -> Result<AdmittanceComponents, YBusError> {
    AdmittanceComponents::from_network(network)
}

/// Flat start: `e = 1`, `f = 0` at every bus (1.0 pu, 0 rad).
pub fn initialize_voltage_features(n_buses: usize) -> (Array1<f64>, Array1<f64>) {
    (Array1::ones(n_buses), Array1::zeros(n_buses))
}
