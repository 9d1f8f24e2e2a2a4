use std::collections::HashMap;
use std::fmt;

use petgraph::graph::Graph;
use petgraph::Undirected;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::elements::{Branch, Bus, Edge, Gen, Load, Node, Shunt};
use crate::error::{PgopfError, PgopfResult};
use crate::ids::BusId;
use crate::units::{MegavoltAmperes, PerUnit, Radians};

/// System base used when a case does not carry one.
pub const DEFAULT_BASE_MVA: f64 = 100.0;

/// Outcome of the last power-flow run on a network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SolveState {
    #[default]
    Unsolved,
    Converged { iterations: usize, max_mismatch: f64 },
    /// Converged only after the tolerance was loosened
    Relaxed { iterations: usize, max_mismatch: f64 },
    Failed { reason: String },
}

impl SolveState {
    pub fn is_solved(&self) -> bool {
        matches!(self, Self::Converged { .. } | Self::Relaxed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unsolved => "unsolved",
            Self::Converged { .. } => "converged",
            Self::Relaxed { .. } => "relaxed",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Network {
    pub graph: Graph<Node, Edge, Undirected>,
    pub base_mva: MegavoltAmperes,
    pub solve_state: SolveState,
}

impl Default for Network {
    fn default() -> Self {
        Network {
            graph: Graph::new_undirected(),
            base_mva: MegavoltAmperes(DEFAULT_BASE_MVA),
            solve_state: SolveState::Unsolved,
        }
    }
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_mva(self, base_mva: f64) -> Self {
        Network {
            base_mva: MegavoltAmperes(base_mva),
            ..self
        }
    }

    /// True once bus voltages hold a power-flow solution, strict or relaxed.
    pub fn has_solved_state(&self) -> bool {
        self.solve_state.is_solved()
    }

    fn nodes_where<'a, T: 'a>(&'a self, pick: fn(&'a Node) -> Option<&'a T>) -> Vec<&'a T> {
        self.graph.node_weights().filter_map(pick).collect()
    }

    pub fn buses(&self) -> Vec<&Bus> {
        self.nodes_where(Node::as_bus)
    }

    pub fn generators(&self) -> Vec<&Gen> {
        self.nodes_where(Node::as_gen)
    }

    pub fn loads(&self) -> Vec<&Load> {
        self.nodes_where(Node::as_load)
    }

    pub fn shunts(&self) -> Vec<&Shunt> {
        self.nodes_where(Node::as_shunt)
    }

    pub fn branches(&self) -> Vec<&Branch> {
        self.graph.edge_weights().map(Edge::branch).collect()
    }

    pub fn generators_at_bus(&self, bus: BusId) -> Vec<&Gen> {
        let mut gens = self.generators();
        gens.retain(|g| g.bus == bus);
        gens
    }

    pub fn n_buses(&self) -> usize {
        self.graph.node_weights().filter_map(Node::as_bus).count()
    }

    /// Buses sorted by id. A bus's position here is its dense index
    /// everywhere downstream.
    pub fn bus_order(&self) -> Vec<&Bus> {
        let mut buses = self.buses();
        buses.sort_by_key(|b| b.id);
        buses
    }

    /// Bus ids carried by more than one bus node, ascending.
    pub fn duplicate_bus_ids(&self) -> Vec<BusId> {
        let order = self.bus_order();
        let mut dups: Vec<BusId> = order
            .windows(2)
            .filter(|pair| pair[0].id == pair[1].id)
            .map(|pair| pair[0].id)
            .collect();
        dups.dedup();
        dups
    }

    pub fn bus_index_map(&self) -> HashMap<BusId, usize> {
        self.bus_order()
            .into_iter()
            .zip(0..)
            .map(|(bus, idx)| (bus.id, idx))
            .collect()
    }

    pub fn stats(&self) -> NetworkStats {
        let mut stats = self.graph.node_weights().fold(
            NetworkStats {
                base_mva: self.base_mva.value(),
                ..NetworkStats::default()
            },
            |mut acc, node| {
                match node {
                    Node::Bus(_) => acc.num_buses += 1,
                    Node::Shunt(_) => acc.num_shunts += 1,
                    Node::Load(load) => {
                        acc.num_loads += 1;
                        acc.total_load_mw += load.active_power.value();
                        acc.total_load_mvar += load.reactive_power.value();
                    }
                    Node::Gen(gen) => {
                        acc.num_gens += 1;
                        if gen.pmax.is_finite() {
                            acc.total_gen_capacity_mw += gen.pmax.value();
                        }
                    }
                }
                acc
            },
        );
        stats.num_branches = self.graph.edge_count();
        stats
    }

    /// Check the network can be turned into an admittance matrix.
    ///
    /// Anything that would break construction (dangling references, zero
    /// series impedance, no buses) is an error; odd but usable data is a
    /// warning.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        let stats = self.stats();
        if stats.num_buses == 0 {
            diag.add_error("structure", "Network has no buses");
            return;
        }

        let base = self.base_mva.value();
        if base.is_nan() || base <= 0.0 {
            diag.add_error("structure", &format!("Base MVA must be positive, got {base}"));
        }
        if stats.num_gens == 0 {
            diag.add_error("structure", "Network has no generators");
        }
        if stats.num_buses > 1 && stats.num_branches == 0 {
            diag.add_error("structure", "Network has multiple buses but no branches");
        }
        if stats.total_load_mw.abs() < 1e-9 {
            diag.add_warning("structure", "Network has no loads");
        }

        for id in self.duplicate_bus_ids() {
            diag.add_error_with_entity(
                "duplicate_bus",
                "Bus id appears more than once",
                &id.to_string(),
            );
        }

        let index = self.bus_index_map();
        let known = |bus: &BusId| index.contains_key(bus);

        for node in self.graph.node_weights() {
            if let Some(bus) = node.attached_bus().filter(|b| !known(b)) {
                diag.add_error_with_entity(
                    "reference",
                    &format!("References unknown bus {}", bus.value()),
                    &node.entity(),
                );
            }
        }

        for branch in self.branches() {
            let entity = format!("Branch {}-{}", branch.from_bus.value(), branch.to_bus.value());
            if !(known(&branch.from_bus) && known(&branch.to_bus)) {
                diag.add_error_with_entity("reference", "Endpoint bus does not exist", &entity);
            }
            if branch.status && branch.resistance == 0.0 && branch.reactance == 0.0 {
                diag.add_error_with_entity("physical", "Zero series impedance", &entity);
            }
            if branch.tap_ratio <= 0.0 {
                diag.add_warning_with_entity(
                    "physical",
                    &format!("Non-positive tap ratio {}", branch.tap_ratio),
                    &entity,
                );
            }
        }

        for gen in self.generators().into_iter().filter(|g| g.has_inverted_limits()) {
            diag.add_warning_with_entity(
                "physical",
                "Lower limit exceeds upper limit",
                &gen.id.to_string(),
            );
        }
    }

    /// Store a solved voltage profile on the buses. `vm` and `va` follow
    /// [`Network::bus_order`].
    pub fn apply_voltages(&mut self, vm: &[f64], va: &[f64]) -> PgopfResult<()> {
        let index = self.bus_index_map();
        let n = index.len();
        if vm.len() != n || va.len() != n {
            return Err(PgopfError::Validation(format!(
                "voltage profile has {} magnitudes and {} angles for {n} buses",
                vm.len(),
                va.len(),
            )));
        }
        for node in self.graph.node_weights_mut() {
            let Node::Bus(bus) = node else { continue };
            let idx = index[&bus.id];
            bus.voltage_pu = PerUnit(vm[idx]);
            bus.angle_rad = Radians(va[idx]);
        }
        Ok(())
    }
}

/// Element counts and totals, in engineering units.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkStats {
    pub num_buses: usize,
    pub num_gens: usize,
    pub num_loads: usize,
    pub num_shunts: usize,
    pub num_branches: usize,
    pub base_mva: f64,
    pub total_load_mw: f64,
    pub total_load_mvar: f64,
    pub total_gen_capacity_mw: f64,
}

impl fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} buses, {} branches, {} gens ({:.0} MW), {} loads ({:.0} MW), base {:.0} MVA",
            self.num_buses,
            self.num_branches,
            self.num_gens,
            self.total_gen_capacity_mw,
            self.num_loads,
            self.total_load_mw,
            self.base_mva
        )
    }
}
