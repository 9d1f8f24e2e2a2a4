//! AC power flow (polar Newton-Raphson).
//!
//! Feature construction needs a solved network before it extracts admittance.
//! The solve is behind the [`PowerFlowEngine`] trait so callers can plug in
//! another engine; [`NewtonRaphsonEngine`] is the bundled one.
//!
//! ## Bus classification
//!
//! | type  | specified  | solved for |
//! |-------|------------|------------|
//! | slack | \|V\|, θ=0 | P, Q       |
//! | PV    | P, \|V\|   | Q, θ       |
//! | PQ    | P, Q       | \|V\|, θ   |
//!
//! The slack is the first in-service generator bus in canonical bus order,
//! remaining generator buses are PV and everything else is PQ.
//!
//! ## Iteration
//!
//! With `V = |V|·e^{jθ}`, `I = Y·V` and `S = V∘conj(I)`:
//!
//! ```text
//! ∂S/∂|V| = diag(V)·conj(Y·diag(V/|V|)) + conj(diag(I))·diag(V/|V|)
//! ∂S/∂θ   = j·diag(V)·conj(diag(I) - Y·diag(V))
//!
//! J = [ Re ∂S/∂θ [pvpq,pvpq]   Re ∂S/∂|V| [pvpq,pq] ]
//!     [ Im ∂S/∂θ [pq,pvpq]     Im ∂S/∂|V| [pq,pq]   ]
//! ```
//!
//! The correction `J·Δx = -F` is solved with faer's partial-pivot LU.
//! Reactive limits are not enforced.

use faer::{prelude::*, solvers::PartialPivLu, Mat};
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use pgopf_core::{BusId, Network, PgopfError, SolveState};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::ybus::{SparseYBus, YBusError};

/// Tolerance multiplier for the relaxed retry.
pub const RELAX_FACTOR: f64 = 1e3;

#[derive(Debug, Error)]
pub enum PowerFlowError {
    #[error("admittance construction failed: {0}")]
    Admittance(#[from] YBusError),

    #[error("network has no in-service generator to act as slack")]
    NoSlack,

    #[error("singular Jacobian at iteration {iteration}")]
    SingularJacobian { iteration: usize },

    #[error("did not converge in {iterations} iterations (max mismatch {max_mismatch:.3e} pu)")]
    Diverged {
        iterations: usize,
        max_mismatch: f64,
    },

    #[error("failed to write solution back: {0}")]
    WriteBack(String),
}

impl From<PowerFlowError> for PgopfError {
    fn from(err: PowerFlowError) -> Self {
        match err {
            PowerFlowError::Admittance(e) => e.into(),
            other => PgopfError::Solver(other.to_string()),
        }
    }
}

/// Convergence settings for one solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Largest acceptable power mismatch (per-unit)
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 10,
        }
    }
}

impl SolveOptions {
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Looser settings for the retry after a failed solve.
    pub fn relaxed(&self) -> Self {
        Self {
            tolerance: self.tolerance * RELAX_FACTOR,
            max_iterations: self.max_iterations * 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BusType {
    Slack,
    PV,
    PQ,
}

/// Outcome of a converged solve. Vectors are in canonical bus order.
#[derive(Debug, Clone, Serialize)]
pub struct PowerFlowReport {
    pub iterations: usize,
    pub max_mismatch: f64,
    pub slack_bus: BusId,
    pub bus_types: Vec<BusType>,
    pub voltage_magnitude: Vec<f64>,
    pub voltage_angle: Vec<f64>,
    /// Net complex injection `P + jQ` per bus, per-unit
    #[serde(skip)]
    pub injections: Vec<Complex64>,
}

/// Something that can bring a network to a solved state.
///
/// On success the engine writes bus voltages back onto `network` and marks it
/// [`SolveState::Converged`]. On failure the network is left untouched.
pub trait PowerFlowEngine: Send + Sync {
    fn solve(
        &self,
        network: &mut Network,
        options: &SolveOptions,
    ) -> Result<PowerFlowReport, PowerFlowError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NewtonRaphsonEngine;

impl NewtonRaphsonEngine {
    pub fn new() -> Self {
        Self
    }
}

struct Setup {
    slack_bus: BusId,
    bus_types: Vec<BusType>,
    s_spec: Array1<Complex64>,
    vm: Vec<f64>,
    va: Vec<f64>,
}

fn prepare(network: &Network) -> Result<Setup, PowerFlowError> {
    let order = network.bus_order();
    let index = network.bus_index_map();
    let n = order.len();
    let base = network.base_mva;

    let mut s_spec = Array1::<Complex64>::zeros(n);
    let mut gen_setpoint: Vec<Option<f64>> = vec![None; n];
    let mut has_gen = vec![false; n];

    for gen in network.generators().into_iter().filter(|g| g.status) {
        let Some(&idx) = index.get(&gen.bus) else {
            return Err(YBusError::UnknownBus(gen.bus.value()).into());
        };
        has_gen[idx] = true;
        s_spec[idx] += Complex64::new(
            gen.active_power.to_per_unit(base).value(),
            gen.reactive_power.to_per_unit(base).value(),
        );
        if gen_setpoint[idx].is_none() {
            gen_setpoint[idx] = gen.voltage_setpoint.map(|v| v.value());
        }
    }
    for load in network.loads() {
        let Some(&idx) = index.get(&load.bus) else {
            return Err(YBusError::UnknownBus(load.bus.value()).into());
        };
        s_spec[idx] -= Complex64::new(
            load.active_power.to_per_unit(base).value(),
            load.reactive_power.to_per_unit(base).value(),
        );
    }

    let slack_idx = has_gen.iter().position(|&g| g).ok_or(PowerFlowError::NoSlack)?;
    let bus_types: Vec<BusType> = (0..n)
        .map(|i| match (i == slack_idx, has_gen[i]) {
            (true, _) => BusType::Slack,
            (false, true) => BusType::PV,
            (false, false) => BusType::PQ,
        })
        .collect();

    let vm = order
        .iter()
        .enumerate()
        .map(|(i, bus)| match bus_types[i] {
            BusType::PQ => 1.0,
            _ => gen_setpoint[i].unwrap_or(bus.voltage_pu.value()),
        })
        .collect();

    Ok(Setup {
        slack_bus: order[slack_idx].id,
        bus_types,
        s_spec,
        vm,
        va: vec![0.0; n],
    })
}

fn polar(vm: &[f64], va: &[f64]) -> Array1<Complex64> {
    vm.iter()
        .zip(va)
        .map(|(&m, &a)| Complex64::from_polar(m, a))
        .collect()
}

fn jacobian(
    y: &Array2<Complex64>,
    v: &Array1<Complex64>,
    current: &Array1<Complex64>,
    pvpq: &[usize],
    pq: &[usize],
) -> Array2<f64> {
    let v_unit = v.mapv(|x| if x.norm() > 0.0 { x / x.norm() } else { x });
    let j = Complex64::i();

    let ds_dvm = |r: usize, c: usize| {
        let mut val = v[r] * (y[[r, c]] * v_unit[c]).conj();
        if r == c {
            val += current[r].conj() * v_unit[r];
        }
        val
    };
    let ds_dva = |r: usize, c: usize| {
        let diag_i = if r == c { current[r] } else { Complex64::new(0.0, 0.0) };
        j * v[r] * (diag_i - y[[r, c]] * v[c]).conj()
    };

    let m = pvpq.len() + pq.len();
    let mut jac = Array2::<f64>::zeros((m, m));
    for (row, &r) in pvpq.iter().enumerate() {
        for (col, &c) in pvpq.iter().enumerate() {
            jac[[row, col]] = ds_dva(r, c).re;
        }
        for (col, &c) in pq.iter().enumerate() {
            jac[[row, pvpq.len() + col]] = ds_dvm(r, c).re;
        }
    }
    for (row, &r) in pq.iter().enumerate() {
        let row = pvpq.len() + row;
        for (col, &c) in pvpq.iter().enumerate() {
            jac[[row, col]] = ds_dva(r, c).im;
        }
        for (col, &c) in pq.iter().enumerate() {
            jac[[row, pvpq.len() + col]] = ds_dvm(r, c).im;
        }
    }
    jac
}

fn solve_dense(jac: &Array2<f64>, rhs: &[f64]) -> Option<Vec<f64>> {
    let n = rhs.len();
    let mat = Mat::from_fn(n, n, |i, j| jac[[i, j]]);
    let rhs_mat = Mat::from_fn(n, 1, |i, _| rhs[i]);
    let lu = PartialPivLu::new(mat.as_ref());
    let sol = lu.solve(&rhs_mat);
    let x: Vec<f64> = (0..n).map(|i| sol.read(i, 0)).collect();
    x.iter().all(|v| v.is_finite()).then_some(x)
}

impl PowerFlowEngine for NewtonRaphsonEngine {
    fn solve(
        &self,
        network: &mut Network,
        options: &SolveOptions,
    ) -> Result<PowerFlowReport, PowerFlowError> {
        let y = SparseYBus::from_network(network)?.to_dense();
        let Setup {
            slack_bus,
            bus_types,
            s_spec,
            mut vm,
            mut va,
        } = prepare(network)?;

        let pv: Vec<usize> = (0..bus_types.len())
            .filter(|&i| bus_types[i] == BusType::PV)
            .collect();
        let pq: Vec<usize> = (0..bus_types.len())
            .filter(|&i| bus_types[i] == BusType::PQ)
            .collect();
        let pvpq: Vec<usize> = pv.iter().chain(&pq).copied().collect();

        let mut iteration = 0;
        loop {
            let v = polar(&vm, &va);
            let current = y.dot(&v);
            let s_calc: Array1<Complex64> = v
                .iter()
                .zip(current.iter())
                .map(|(vi, ii)| vi * ii.conj())
                .collect();
            let mismatch = &s_calc - &s_spec;

            let residual: Vec<f64> = pvpq
                .iter()
                .map(|&i| mismatch[i].re)
                .chain(pq.iter().map(|&i| mismatch[i].im))
                .collect();
            let max_mismatch = residual.iter().fold(0.0_f64, |acc, r| acc.max(r.abs()));
            debug!(iteration, max_mismatch, "newton-raphson step");

            if max_mismatch < options.tolerance {
                info!(
                    iterations = iteration,
                    max_mismatch,
                    slack = slack_bus.value(),
                    "power flow converged"
                );
                network
                    .apply_voltages(&vm, &va)
                    .map_err(|e| PowerFlowError::WriteBack(e.to_string()))?;
                network.solve_state = SolveState::Converged {
                    iterations: iteration,
                    max_mismatch,
                };
                return Ok(PowerFlowReport {
                    iterations: iteration,
                    max_mismatch,
                    slack_bus,
                    bus_types,
                    voltage_magnitude: vm,
                    voltage_angle: va,
                    injections: s_calc.to_vec(),
                });
            }
            if iteration >= options.max_iterations || !max_mismatch.is_finite() {
                return Err(PowerFlowError::Diverged {
                    iterations: iteration,
                    max_mismatch,
                });
            }

            iteration += 1;
            let jac = jacobian(&y, &v, &current, &pvpq, &pq);
            let rhs: Vec<f64> = residual.iter().map(|r| -r).collect();
            let dx = solve_dense(&jac, &rhs)
                .ok_or(PowerFlowError::SingularJacobian { iteration })?;

            for (k, &i) in pvpq.iter().enumerate() {
                va[i] += dx[k];
            }
            for (k, &i) in pq.iter().enumerate() {
                vm[i] += dx[pvpq.len() + k];
            }
        }
    }
}
