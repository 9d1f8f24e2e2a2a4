//! Input bundle handed to the graph-convolution model.

use std::fmt;

use ndarray::{Array1, Array2};
use serde::Serialize;

use crate::features::{FeatureConstructionPipeline, FeatureError};

/// Node features plus the physics parameters the convolution layer needs.
#[derive(Debug, Clone, Serialize)]
pub struct GcnnInput {
    /// `(n_buses, 2K)` stacked `[e | f]` history
    pub node_features: Array2<f64>,
    pub pd: Array1<f64>,
    pub qd: Array1<f64>,
    pub g_diag: Array2<f64>,
    pub b_diag: Array2<f64>,
    pub g_nd: Array2<f64>,
    pub b_nd: Array2<f64>,
    pub n_buses: usize,
    pub num_iterations: usize,
}

/// Borrowed view of the physics parameters, shared by every layer of a model.
#[derive(Debug, Clone, Copy)]
pub struct PhysicsParams<'a> {
    pub pd: &'a Array1<f64>,
    pub qd: &'a Array1<f64>,
    pub g_diag: &'a Array2<f64>,
    pub b_diag: &'a Array2<f64>,
    pub g_nd: &'a Array2<f64>,
    pub b_nd: &'a Array2<f64>,
}

impl PhysicsParams<'_> {
    pub fn n_buses(&self) -> usize {
        self.pd.len()
    }
}

impl GcnnInput {
    pub fn from_pipeline(
        pipeline: &FeatureConstructionPipeline,
        num_iterations: usize,
    ) -> Result<Self, FeatureError> {
        let node_features = pipeline.stacked_features(num_iterations)?;
        let adm = pipeline.admittance();
        let inj = pipeline.injections();
        Ok(Self {
            node_features,
            pd: inj.pd.clone(),
            qd: inj.qd.clone(),
            g_diag: adm.g_diag.clone(),
            b_diag: adm.b_diag.clone(),
            g_nd: adm.g_nd.clone(),
            b_nd: adm.b_nd.clone(),
            n_buses: pipeline.n_buses(),
            num_iterations,
        })
    }

    pub fn physics(&self) -> PhysicsParams<'_> {
        PhysicsParams {
            pd: &self.pd,
            qd: &self.qd,
            g_diag: &self.g_diag,
            b_diag: &self.b_diag,
            g_nd: &self.g_nd,
            b_nd: &self.b_nd,
        }
    }

    pub fn summary(&self) -> GcnnInputSummary {
        let total = |a: &Array1<f64>| a.sum();
        GcnnInputSummary {
            n_buses: self.n_buses,
            num_iterations: self.num_iterations,
            feature_shape: self.node_features.dim(),
            total_pd_pu: total(&self.pd),
            total_qd_pu: total(&self.qd),
            mutual_couplings: self
                .g_nd
                .iter()
                .zip(self.b_nd.iter())
                .filter(|(g, b)| **g != 0.0 || **b != 0.0)
                .count(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GcnnInputSummary {
    pub n_buses: usize,
    pub num_iterations: usize,
    pub feature_shape: (usize, usize),
    pub total_pd_pu: f64,
    pub total_qd_pu: f64,
    /// Nonzero off-diagonal admittance entries
    pub mutual_couplings: usize,
}

impl fmt::Display for GcnnInputSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} buses, K={}, features {}x{}, demand {:.4} + j{:.4} pu, {} mutual couplings",
            self.n_buses,
            self.num_iterations,
            self.feature_shape.0,
            self.feature_shape.1,
            self.total_pd_pu,
            self.total_qd_pu,
            self.mutual_couplings
        )
    }
}
