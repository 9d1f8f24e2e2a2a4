//! Per-bus demand and generation limits in per-unit.

use ndarray::Array1;
use pgopf_core::{Network, PgopfError, PgopfResult};

use crate::aggregation::PowerLimits;

/// Demand and generator bounds aggregated per bus, in canonical bus order.
///
/// Loads at the same bus are summed; so are the limits of every in-service
/// generator at a bus. Buses without generators have all four limits at zero.
#[derive(Debug, Clone)]
pub struct BusInjections {
    pub pd: Array1<f64>,
    pub qd: Array1<f64>,
    pub limits: PowerLimits,
}

impl BusInjections {
    pub fn from_network(network: &Network) -> PgopfResult<Self> {
        let base = network.base_mva;
        if base.value().is_nan() || base.value() <= 0.0 {
            return Err(PgopfError::Validation(format!(
                "base MVA must be positive, got {}",
                base.value()
            )));
        }
        if let Some(id) = network.duplicate_bus_ids().first() {
            return Err(PgopfError::Network(format!(
                "bus id {} appears more than once",
                id.value()
            )));
        }
        let index = network.bus_index_map();
        let n = index.len();
        let lookup = |bus: pgopf_core::BusId, what: &str| {
            index.get(&bus).copied().ok_or_else(|| {
                PgopfError::Network(format!("{what} references unknown bus {}", bus.value()))
            })
        };

        let mut pd = Array1::zeros(n);
        let mut qd = Array1::zeros(n);
        for load in network.loads() {
            let idx = lookup(load.bus, "load")?;
            pd[idx] += load.active_power.to_per_unit(base).value();
            qd[idx] += load.reactive_power.to_per_unit(base).value();
        }

        let mut limits = PowerLimits {
            pg_min: Array1::zeros(n),
            pg_max: Array1::zeros(n),
            qg_min: Array1::zeros(n),
            qg_max: Array1::zeros(n),
        };
        for gen in network.generators().into_iter().filter(|g| g.status) {
            let idx = lookup(gen.bus, "generator")?;
            limits.pg_min[idx] += gen.pmin.to_per_unit(base).value();
            limits.pg_max[idx] += gen.pmax.to_per_unit(base).value();
            limits.qg_min[idx] += gen.qmin.to_per_unit(base).value();
            limits.qg_max[idx] += gen.qmax.to_per_unit(base).value();
        }

        Ok(Self { pd, qd, limits })
    }

    pub fn n_buses(&self) -> usize {
        self.pd.len()
    }
}
