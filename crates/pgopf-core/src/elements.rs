//! Network elements as stored on the graph.
//!
//! Nodes carry buses and everything attached to one; edges carry branches.
//! Lines and transformers share [`Branch`]: a plain line just keeps
//! `tap_ratio == 1.0` and a zero phase shift.

use crate::ids::{BranchId, BusId, GenId, LoadId, ShuntId};
use crate::units::{Kilovolts, Megavars, MegavoltAmperes, Megawatts, PerUnit, Radians};

#[derive(Debug, Clone)]
pub struct Bus {
    pub id: BusId,
    pub name: String,
    pub base_kv: Kilovolts,
    /// Voltage magnitude; the power-flow solution once one has been applied
    pub voltage_pu: PerUnit,
    pub angle_rad: Radians,
    pub vmin_pu: Option<PerUnit>,
    pub vmax_pu: Option<PerUnit>,
}

impl Default for Bus {
    fn default() -> Self {
        Bus {
            id: BusId::default(),
            name: String::new(),
            base_kv: Kilovolts::default(),
            voltage_pu: PerUnit::ONE,
            angle_rad: Radians::default(),
            vmin_pu: None,
            vmax_pu: None,
        }
    }
}

/// Pi-model branch. Impedances are per-unit on the system base.
#[derive(Debug, Clone)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    pub from_bus: BusId,
    pub to_bus: BusId,
    pub resistance: f64,
    pub reactance: f64,
    /// Off-nominal turns ratio on the from side
    pub tap_ratio: f64,
    pub phase_shift: Radians,
    /// Total charging susceptance, half at each end
    pub charging_b: PerUnit,
    pub rating_a: Option<MegavoltAmperes>,
    pub status: bool,
}

impl Default for Branch {
    fn default() -> Self {
        Branch {
            id: BranchId::default(),
            name: String::new(),
            from_bus: BusId::default(),
            to_bus: BusId::default(),
            resistance: 0.0,
            reactance: 0.0,
            tap_ratio: 1.0,
            phase_shift: Radians::default(),
            charging_b: PerUnit::default(),
            rating_a: None,
            status: true,
        }
    }
}

impl Branch {
    pub fn new(
        id: BranchId,
        name: String,
        from_bus: BusId,
        to_bus: BusId,
        resistance: f64,
        reactance: f64,
    ) -> Self {
        Branch {
            id,
            name,
            from_bus,
            to_bus,
            resistance,
            reactance,
            ..Branch::default()
        }
    }

    pub fn with_charging(self, b_pu: f64) -> Self {
        Branch {
            charging_b: PerUnit(b_pu),
            ..self
        }
    }

    pub fn with_tap(self, ratio: f64, shift: Radians) -> Self {
        Branch {
            tap_ratio: ratio,
            phase_shift: shift,
            ..self
        }
    }
}

#[derive(Debug, Clone)]
pub struct Gen {
    pub id: GenId,
    pub name: String,
    pub bus: BusId,
    /// Scheduled dispatch
    pub active_power: Megawatts,
    pub reactive_power: Megavars,
    pub pmin: Megawatts,
    pub pmax: Megawatts,
    pub qmin: Megavars,
    pub qmax: Megavars,
    pub status: bool,
    pub voltage_setpoint: Option<PerUnit>,
}

impl Default for Gen {
    fn default() -> Self {
        Gen::new(GenId::default(), String::new(), BusId::default())
    }
}

impl Gen {
    /// In-service unit with zero dispatch and open limits.
    pub fn new(id: GenId, name: String, bus: BusId) -> Self {
        Gen {
            id,
            name,
            bus,
            active_power: Megawatts::default(),
            reactive_power: Megavars::default(),
            pmin: Megawatts::default(),
            pmax: Megawatts(f64::INFINITY),
            qmin: Megavars(f64::NEG_INFINITY),
            qmax: Megavars(f64::INFINITY),
            status: true,
            voltage_setpoint: None,
        }
    }

    pub fn with_p_limits(self, pmin: f64, pmax: f64) -> Self {
        Gen {
            pmin: Megawatts(pmin),
            pmax: Megawatts(pmax),
            ..self
        }
    }

    pub fn with_q_limits(self, qmin: f64, qmax: f64) -> Self {
        Gen {
            qmin: Megavars(qmin),
            qmax: Megavars(qmax),
            ..self
        }
    }

    pub fn with_dispatch(self, p_mw: f64, q_mvar: f64) -> Self {
        Gen {
            active_power: Megawatts(p_mw),
            reactive_power: Megavars(q_mvar),
            ..self
        }
    }

    pub fn with_voltage_setpoint(self, vm_pu: f64) -> Self {
        Gen {
            voltage_setpoint: Some(PerUnit(vm_pu)),
            ..self
        }
    }

    pub fn has_inverted_limits(&self) -> bool {
        self.pmin > self.pmax || self.qmin > self.qmax
    }
}

#[derive(Debug, Clone)]
pub struct Load {
    pub id: LoadId,
    pub name: String,
    pub bus: BusId,
    pub active_power: Megawatts,
    pub reactive_power: Megavars,
}

/// Fixed shunt, per-unit on the system base.
#[derive(Debug, Clone)]
pub struct Shunt {
    pub id: ShuntId,
    pub name: String,
    pub bus: BusId,
    pub gs_pu: f64,
    pub bs_pu: f64,
    pub status: bool,
}

impl Default for Shunt {
    fn default() -> Self {
        Shunt {
            id: ShuntId::default(),
            name: String::new(),
            bus: BusId::default(),
            gs_pu: 0.0,
            bs_pu: 0.0,
            status: true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Bus(Bus),
    Gen(Gen),
    Load(Load),
    Shunt(Shunt),
}

impl Node {
    pub fn as_bus(&self) -> Option<&Bus> {
        match self {
            Node::Bus(bus) => Some(bus),
            _ => None,
        }
    }

    pub fn as_gen(&self) -> Option<&Gen> {
        match self {
            Node::Gen(gen) => Some(gen),
            _ => None,
        }
    }

    pub fn as_load(&self) -> Option<&Load> {
        match self {
            Node::Load(load) => Some(load),
            _ => None,
        }
    }

    pub fn as_shunt(&self) -> Option<&Shunt> {
        match self {
            Node::Shunt(shunt) => Some(shunt),
            _ => None,
        }
    }

    /// Bus an attached element hangs off; `None` for buses themselves.
    pub fn attached_bus(&self) -> Option<BusId> {
        match self {
            Node::Bus(_) => None,
            Node::Gen(gen) => Some(gen.bus),
            Node::Load(load) => Some(load.bus),
            Node::Shunt(shunt) => Some(shunt.bus),
        }
    }

    /// Entity label used in diagnostics, e.g. `Gen 3`.
    pub fn entity(&self) -> String {
        match self {
            Node::Bus(bus) => bus.id.to_string(),
            Node::Gen(gen) => gen.id.to_string(),
            Node::Load(load) => load.id.to_string(),
            Node::Shunt(shunt) => shunt.id.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Edge {
    Branch(Branch),
}

impl Edge {
    pub fn branch(&self) -> &Branch {
        match self {
            Edge::Branch(branch) => branch,
        }
    }
}
