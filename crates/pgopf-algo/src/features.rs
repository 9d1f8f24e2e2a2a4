//! Feature construction: K voltage iterates from the aggregation kernel.
//!
//! Starting from the flat start, each step maps the previous `(e, f)` pair
//! to the next one through the kernel in [`crate::aggregation`]. Every
//! iterate is kept; the output is the full history, not a converged value.
//!
//! ```text
//! (e⁰, f⁰) = flat start
//! (eᵏ, fᵏ) = step(eᵏ⁻¹, fᵏ⁻¹)          k = 1..K-1
//! features = [e⁰ … eᴷ⁻¹ | f⁰ … fᴷ⁻¹]    shape (n_buses, 2K)
//! ```
//!
//! Before extracting admittance the pipeline makes sure the network carries a
//! solved state. A failed solve is retried once with relaxed settings; if that
//! fails too, construction continues on the unsolved snapshot with a warning.
//! Only admittance construction failures are fatal.

use ndarray::{Array1, Array2};
use pgopf_core::{Diagnostics, Network, PgopfError, SolveState};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::admittance::{initialize_voltage_features, AdmittanceComponents};
use crate::aggregation::{
    aggregate_features, apply_power_limits, compute_alpha_beta, compute_delta_lambda,
    compute_pg_qg, normalize_features,
};
use crate::injections::BusInjections;
use crate::power_flow::{PowerFlowEngine, SolveOptions};
use crate::ybus::YBusError;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("num_iterations must be at least 1, got {0}")]
    InvalidIterations(usize),

    #[error("admittance construction failed: {0}")]
    Admittance(#[from] YBusError),

    #[error(transparent)]
    Network(#[from] PgopfError),
}

impl From<FeatureError> for PgopfError {
    fn from(err: FeatureError) -> Self {
        match err {
            FeatureError::InvalidIterations(_) => PgopfError::Config(err.to_string()),
            FeatureError::Admittance(e) => e.into(),
            FeatureError::Network(e) => e,
        }
    }
}

/// Per-iteration voltage features, one column per iterate.
#[derive(Debug, Clone, Serialize)]
pub struct VoltageHistory {
    /// Real parts, `(n_buses, K)`
    pub e: Array2<f64>,
    /// Imaginary parts, `(n_buses, K)`
    pub f: Array2<f64>,
}

impl VoltageHistory {
    fn from_iterates(iterates: &[(Array1<f64>, Array1<f64>)], n_buses: usize) -> Self {
        let k = iterates.len();
        Self {
            e: Array2::from_shape_fn((n_buses, k), |(bus, it)| iterates[it].0[bus]),
            f: Array2::from_shape_fn((n_buses, k), |(bus, it)| iterates[it].1[bus]),
        }
    }

    pub fn num_iterations(&self) -> usize {
        self.e.ncols()
    }

    /// `[e | f]` column stack, `(n_buses, 2K)`.
    pub fn stacked(&self) -> Array2<f64> {
        let (n, k) = self.e.dim();
        Array2::from_shape_fn((n, 2 * k), |(bus, col)| {
            if col < k {
                self.e[[bus, col]]
            } else {
                self.f[[bus, col - k]]
            }
        })
    }
}

pub struct FeatureConstructionPipeline {
    network: Network,
    admittance: AdmittanceComponents,
    g_full: Array2<f64>,
    b_full: Array2<f64>,
    injections: BusInjections,
    diagnostics: Diagnostics,
}

impl FeatureConstructionPipeline {
    /// Solve `network` if needed, then extract admittance and per-bus injections.
    pub fn new(
        mut network: Network,
        engine: &dyn PowerFlowEngine,
        options: &SolveOptions,
    ) -> Result<Self, FeatureError> {
        let mut diagnostics = Diagnostics::new();
        ensure_solved(&mut network, engine, options, &mut diagnostics);
        Self::from_network(network, diagnostics)
    }

    /// Build without attempting a power flow, whatever the solve state.
    pub fn without_solve(network: Network) -> Result<Self, FeatureError> {
        Self::from_network(network, Diagnostics::new())
    }

    fn from_network(network: Network, diagnostics: Diagnostics) -> Result<Self, FeatureError> {
        let admittance = AdmittanceComponents::from_network(&network)?;
        let injections = BusInjections::from_network(&network)?;
        Ok(Self {
            g_full: admittance.g_full(),
            b_full: admittance.b_full(),
            network,
            admittance,
            injections,
            diagnostics,
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn admittance(&self) -> &AdmittanceComponents {
        &self.admittance
    }

    pub fn injections(&self) -> &BusInjections {
        &self.injections
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn n_buses(&self) -> usize {
        self.admittance.n_buses()
    }

    /// One aggregation step from the current iterate.
    pub fn step(&self, e: &Array1<f64>, f: &Array1<f64>) -> (Array1<f64>, Array1<f64>) {
        let BusInjections { pd, qd, limits } = &self.injections;
        let adm = &self.admittance;

        let (pg, qg) = compute_pg_qg(e, f, &self.g_full, &self.b_full, pd, qd);
        let (pg, qg) = apply_power_limits(&pg, &qg, limits);
        let (alpha, beta) = compute_alpha_beta(e, f, &adm.g_nd, &adm.b_nd);
        let (delta, lambda) =
            compute_delta_lambda(&pg, &qg, pd, qd, e, f, &adm.g_diag, &adm.b_diag);
        let (e_new, f_new) = aggregate_features(&alpha, &beta, &delta, &lambda);
        normalize_features(&e_new, &f_new)
    }

    /// Run `num_iterations` iterates (the flat start plus `num_iterations - 1` steps).
    pub fn run(&self, num_iterations: usize) -> Result<VoltageHistory, FeatureError> {
        if num_iterations == 0 {
            return Err(FeatureError::InvalidIterations(num_iterations));
        }
        let n = self.n_buses();
        let iterates: Vec<(Array1<f64>, Array1<f64>)> =
            std::iter::successors(Some(initialize_voltage_features(n)), |(e, f)| {
                Some(self.step(e, f))
            })
            .take(num_iterations)
            .collect();

        if let Some((e, f)) = iterates.last() {
            let degenerate = e
                .iter()
                .zip(f.iter())
                .filter(|(e, f)| **e == 0.0 && **f == 0.0)
                .count();
            debug!(
                n_buses = n,
                num_iterations,
                degenerate_buses = degenerate,
                "feature construction finished"
            );
        }
        Ok(VoltageHistory::from_iterates(&iterates, n))
    }

    /// `[e-history | f-history]`, `(n_buses, 2 * num_iterations)`.
    pub fn stacked_features(&self, num_iterations: usize) -> Result<Array2<f64>, FeatureError> {
        Ok(self.run(num_iterations)?.stacked())
    }
}

/// Apply the solve policy, recording what happened on the network and in `diag`.
fn ensure_solved(
    network: &mut Network,
    engine: &dyn PowerFlowEngine,
    options: &SolveOptions,
    diag: &mut Diagnostics,
) {
    if network.has_solved_state() {
        debug!(state = network.solve_state.label(), "network already solved");
        return;
    }

    let first = match engine.solve(network, options) {
        Ok(report) => {
            info!(iterations = report.iterations, "power flow solved");
            return;
        }
        Err(err) => err,
    };

    let relaxed = options.relaxed();
    warn!(
        error = %first,
        tolerance = relaxed.tolerance,
        max_iterations = relaxed.max_iterations,
        "power flow failed, retrying with relaxed settings"
    );
    diag.add_warning("power_flow", &format!("strict solve failed: {first}"));

    match engine.solve(network, &relaxed) {
        Ok(report) => {
            network.solve_state = SolveState::Relaxed {
                iterations: report.iterations,
                max_mismatch: report.max_mismatch,
            };
            diag.add_warning("power_flow", "converged only under relaxed tolerance");
        }
        Err(second) => {
            warn!(error = %second, "relaxed power flow failed, continuing with unsolved network");
            diag.add_warning(
                "power_flow",
                &format!("relaxed solve failed, features built from unsolved snapshot: {second}"),
            );
            network.solve_state = SolveState::Failed {
                reason: second.to_string(),
            };
        }
    }
}

/// Build stacked features for many independent scenarios.
///
/// Scenarios share nothing, so with the `parallel` feature they are spread
/// over the rayon pool. Results keep the input order.
pub fn construct_features_batch(
    networks: Vec<Network>,
    num_iterations: usize,
    engine: &dyn PowerFlowEngine,
    options: &SolveOptions,
) -> Vec<Result<Array2<f64>, FeatureError>> {
    let build = |network: Network| -> Result<Array2<f64>, FeatureError> {
        FeatureConstructionPipeline::new(network, engine, options)?.stacked_features(num_iterations)
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        networks.into_par_iter().map(build).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        networks.into_iter().map(build).collect()
    }
}
