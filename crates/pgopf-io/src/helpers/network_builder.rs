//! Format-agnostic construction of [`pgopf_core::Network`].
//!
//! Importers translate their rows into the plain input structs below and the
//! builder takes care of node indices, sequential element ids and recording
//! orphaned references in [`Diagnostics`].

use std::collections::HashMap;

use pgopf_core::{
    Branch, BranchId, Bus, BusId, Diagnostics, Edge, EdgeIndex, Gen, GenId, Kilovolts, Load, LoadId,
    Megavars, Megawatts, MegavoltAmperes, Network, Node, NodeIndex, PerUnit, Radians, Shunt,
    ShuntId,
};

#[derive(Debug, Clone)]
pub struct BusInput {
    pub id: usize,
    pub base_kv: f64,
    pub voltage_pu: f64,
    pub angle_rad: f64,
    pub vmin_pu: Option<f64>,
    pub vmax_pu: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct LoadInput {
    pub bus_id: usize,
    pub active_power_mw: f64,
    pub reactive_power_mvar: f64,
}

/// Shunt admittance already divided by the system base.
#[derive(Debug, Clone)]
pub struct ShuntInput {
    pub bus_id: usize,
    pub gs_pu: f64,
    pub bs_pu: f64,
}

#[derive(Debug, Clone)]
pub struct GenInput {
    pub bus_id: usize,
    pub pg: f64,
    pub qg: f64,
    pub pmin: f64,
    pub pmax: f64,
    pub qmin: f64,
    pub qmax: f64,
    pub voltage_setpoint_pu: Option<f64>,
    pub in_service: bool,
}

#[derive(Debug, Clone)]
pub struct BranchInput {
    pub from_bus: usize,
    pub to_bus: usize,
    pub resistance: f64,
    pub reactance: f64,
    pub charging_b: f64,
    pub tap_ratio: f64,
    pub phase_shift_rad: f64,
    pub rate_mva: Option<f64>,
    pub in_service: bool,
}

/// Sequential ids handed out per element kind, starting at zero.
#[derive(Debug, Default)]
struct IdSeq {
    load: usize,
    gen: usize,
    branch: usize,
    shunt: usize,
}

fn take(counter: &mut usize) -> usize {
    let id = *counter;
    *counter += 1;
    id
}

/// Incrementally assembles a [`Network`] from importer rows.
///
/// Every `add_*` returns the new graph index, or `None` when the row was
/// dropped because it points at a bus that was never added. Dropped rows are
/// recorded as `orphan_*` warnings.
pub struct NetworkBuilder {
    network: Network,
    buses: HashMap<usize, NodeIndex>,
    diag: Diagnostics,
    ids: IdSeq,
}

impl NetworkBuilder {
    pub fn new(base_mva: f64) -> Self {
        Self::with_capacity(base_mva, 0)
    }

    pub fn with_capacity(base_mva: f64, buses: usize) -> Self {
        NetworkBuilder {
            network: Network::new().with_base_mva(base_mva),
            buses: HashMap::with_capacity(buses),
            diag: Diagnostics::new(),
            ids: IdSeq::default(),
        }
    }

    pub fn add_bus(&mut self, input: BusInput) -> NodeIndex {
        let id = BusId::new(input.id);
        let bus = Bus {
            id,
            name: id.to_string(),
            base_kv: Kilovolts(input.base_kv),
            voltage_pu: PerUnit(input.voltage_pu),
            angle_rad: Radians(input.angle_rad),
            vmin_pu: input.vmin_pu.map(PerUnit),
            vmax_pu: input.vmax_pu.map(PerUnit),
        };
        // A repeated id keeps both nodes; `build` reports it as a `duplicate_bus` error
        let idx = self.network.graph.add_node(Node::Bus(bus));
        self.buses.insert(input.id, idx);
        idx
    }

    fn attach(
        &mut self,
        bus_id: usize,
        kind: &str,
        node: impl FnOnce(&mut IdSeq) -> Node,
    ) -> Option<NodeIndex> {
        if !self.buses.contains_key(&bus_id) {
            self.diag.add_warning(
                &format!("orphan_{kind}"),
                &format!("{kind} references unknown bus {bus_id}"),
            );
            return None;
        }
        let node = node(&mut self.ids);
        Some(self.network.graph.add_node(node))
    }

    pub fn add_load(&mut self, input: LoadInput) -> Option<NodeIndex> {
        self.attach(input.bus_id, "load", |ids| {
            Node::Load(Load {
                id: LoadId::new(take(&mut ids.load)),
                name: format!("Load {}", input.bus_id),
                bus: BusId::new(input.bus_id),
                active_power: Megawatts(input.active_power_mw),
                reactive_power: Megavars(input.reactive_power_mvar),
            })
        })
    }

    pub fn add_shunt(&mut self, input: ShuntInput) -> Option<NodeIndex> {
        self.attach(input.bus_id, "shunt", |ids| {
            Node::Shunt(Shunt {
                id: ShuntId::new(take(&mut ids.shunt)),
                name: format!("Shunt {}", input.bus_id),
                bus: BusId::new(input.bus_id),
                gs_pu: input.gs_pu,
                bs_pu: input.bs_pu,
                status: true,
            })
        })
    }

    pub fn add_gen(&mut self, input: GenInput) -> Option<NodeIndex> {
        self.attach(input.bus_id, "generator", |ids| {
            let id = take(&mut ids.gen);
            let gen = Gen::new(
                GenId::new(id),
                format!("Gen {id}@{}", input.bus_id),
                BusId::new(input.bus_id),
            )
            .with_dispatch(input.pg, input.qg)
            .with_p_limits(input.pmin, input.pmax)
            .with_q_limits(input.qmin, input.qmax);
            Node::Gen(Gen {
                voltage_setpoint: input.voltage_setpoint_pu.map(PerUnit),
                status: input.in_service,
                ..gen
            })
        })
    }

    /// Branches become graph edges; parallel branches stay separate edges.
    pub fn add_branch(&mut self, input: BranchInput) -> Option<EdgeIndex> {
        let name = format!("Branch {}-{}", input.from_bus, input.to_bus);
        let endpoints = (
            self.buses.get(&input.from_bus).copied(),
            self.buses.get(&input.to_bus).copied(),
        );
        let (Some(from), Some(to)) = endpoints else {
            self.diag
                .add_warning_with_entity("orphan_branch", "branch references unknown bus", &name);
            return None;
        };

        let branch = Branch {
            rating_a: input.rate_mva.map(MegavoltAmperes),
            status: input.in_service,
            ..Branch::new(
                BranchId::new(take(&mut self.ids.branch)),
                name,
                BusId::new(input.from_bus),
                BusId::new(input.to_bus),
                input.resistance,
                input.reactance,
            )
            .with_charging(input.charging_b)
            .with_tap(input.tap_ratio, Radians(input.phase_shift_rad))
        };
        Some(self.network.graph.add_edge(from, to, Edge::Branch(branch)))
    }

    /// Finish construction, running structural validation into the diagnostics.
    pub fn build(self) -> (Network, Diagnostics) {
        let NetworkBuilder {
            network, mut diag, ..
        } = self;
        network.validate_into(&mut diag);
        (network, diag)
    }
}
