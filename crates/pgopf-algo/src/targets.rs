//! Supervised targets: solved generator output and voltage magnitude per bus.
//!
//! The network is solved on a private copy with the same strict-then-relaxed
//! policy the feature pipeline uses. When both attempts fail the targets are
//! all zeros and a warning is logged, so a batch of scenarios never aborts on
//! one bad snapshot.

use ndarray::Array2;
use pgopf_core::{Megawatts, Network};
use tracing::{debug, warn};

use crate::power_flow::{PowerFlowEngine, SolveOptions};

/// Column holding per-unit active generation.
pub const PG_COLUMN: usize = 0;
/// Column holding per-unit voltage magnitude.
pub const VM_COLUMN: usize = 1;

/// `(n_buses, 2)` matrix of `[pg_pu, vm_pu]` in canonical bus order.
///
/// `pg_pu` sums every in-service generator at the bus. PV units keep their
/// scheduled dispatch; the slack bus takes whatever the solved injection
/// needs on top of its local demand. Buses without generation get 0.
pub fn opf_targets(
    network: &Network,
    engine: &dyn PowerFlowEngine,
    options: &SolveOptions,
) -> Array2<f64> {
    let n = network.n_buses();
    let mut solved = network.clone();

    let report = match engine.solve(&mut solved, options) {
        Ok(report) => report,
        Err(first) => {
            debug!(error = %first, "target solve failed, retrying with relaxed settings");
            match engine.solve(&mut solved, &options.relaxed()) {
                Ok(report) => report,
                Err(second) => {
                    warn!(error = %second, "target solve failed twice, using zero targets");
                    return Array2::zeros((n, 2));
                }
            }
        }
    };

    let base = solved.base_mva;
    let loads = solved.loads();
    let mut targets = Array2::zeros((n, 2));

    for (i, bus) in solved.bus_order().into_iter().enumerate() {
        let gens: Vec<_> = solved
            .generators_at_bus(bus.id)
            .into_iter()
            .filter(|g| g.status)
            .collect();

        let slack_injection = (bus.id == report.slack_bus)
            .then(|| report.injections.get(i))
            .flatten();

        targets[[i, PG_COLUMN]] = match (gens.is_empty(), slack_injection) {
            (true, _) => 0.0,
            (false, Some(s)) => {
                let demand: Megawatts = loads
                    .iter()
                    .filter(|l| l.bus == bus.id)
                    .map(|l| l.active_power)
                    .sum();
                s.re + demand.to_per_unit(base).value()
            }
            (false, None) => gens
                .iter()
                .map(|g| g.active_power)
                .sum::<Megawatts>()
                .to_per_unit(base)
                .value(),
        };
        targets[[i, VM_COLUMN]] = bus.voltage_pu.value();
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power_flow::{NewtonRaphsonEngine, PowerFlowError, PowerFlowReport};
    use pgopf_core::{
        Branch, BranchId, Bus, BusId, Edge, Gen, GenId, Load, LoadId, Megavars, Node,
    };

    struct NeverConverges;

    impl PowerFlowEngine for NeverConverges {
        fn solve(
            &self,
            _network: &mut Network,
            options: &SolveOptions,
        ) -> Result<PowerFlowReport, PowerFlowError> {
            Err(PowerFlowError::Diverged {
                iterations: options.max_iterations,
                max_mismatch: 1.0,
            })
        }
    }

    /// Slack at bus 1, a 20 MW PV unit at bus 2, 60 MW of load at bus 3.
    fn three_bus() -> Network {
        let mut network = Network::new();
        let nodes: Vec<_> = (1..=3)
            .map(|id| {
                network.graph.add_node(Node::Bus(Bus {
                    id: BusId::new(id),
                    ..Bus::default()
                }))
            })
            .collect();
        for (k, (a, b)) in [(0, 1), (1, 2), (0, 2)].into_iter().enumerate() {
            network.graph.add_edge(
                nodes[a],
                nodes[b],
                Edge::Branch(Branch::new(
                    BranchId::new(k),
                    format!("{}-{}", a + 1, b + 1),
                    BusId::new(a + 1),
                    BusId::new(b + 1),
                    0.01,
                    0.1,
                )),
            );
        }
        network.graph.add_node(Node::Gen(
            Gen::new(GenId::new(0), "G1".to_string(), BusId::new(1)).with_voltage_setpoint(1.03),
        ));
        network.graph.add_node(Node::Gen(
            Gen::new(GenId::new(1), "G2".to_string(), BusId::new(2))
                .with_dispatch(20.0, 0.0)
                .with_voltage_setpoint(1.01),
        ));
        network.graph.add_node(Node::Load(Load {
            id: LoadId::new(0),
            name: "L3".to_string(),
            bus: BusId::new(3),
            active_power: Megawatts(60.0),
            reactive_power: Megavars(15.0),
        }));
        network
    }

    #[test]
    fn test_targets_follow_solved_state() {
        let network = three_bus();
        let targets = opf_targets(&network, &NewtonRaphsonEngine::new(), &SolveOptions::default());

        assert_eq!(targets.dim(), (3, 2));
        assert!((targets[[0, VM_COLUMN]] - 1.03).abs() < 1e-9);
        assert!((targets[[1, VM_COLUMN]] - 1.01).abs() < 1e-9);
        assert!(targets[[2, VM_COLUMN]] < 1.01);

        assert!((targets[[1, PG_COLUMN]] - 0.2).abs() < 1e-12);
        assert_eq!(targets[[2, PG_COLUMN]], 0.0);
        // slack covers the remaining 0.4 pu plus losses
        let slack = targets[[0, PG_COLUMN]];
        assert!(slack > 0.4 && slack < 0.45, "slack pg {slack}");
    }

    #[test]
    fn test_input_network_is_not_modified() {
        let network = three_bus();
        let _ = opf_targets(&network, &NewtonRaphsonEngine::new(), &SolveOptions::default());
        assert!(!network.has_solved_state());
    }

    #[test]
    fn test_failed_solves_give_zero_targets() {
        let targets = opf_targets(&three_bus(), &NeverConverges, &SolveOptions::default());
        assert_eq!(targets, Array2::<f64>::zeros((3, 2)));
    }

    #[test]
    fn test_out_of_service_generator_contributes_nothing() {
        let mut network = three_bus();
        for node in network.graph.node_weights_mut() {
            if let Node::Gen(gen) = node {
                if gen.id == GenId::new(1) {
                    gen.status = false;
                }
            }
        }
        let targets = opf_targets(&network, &NewtonRaphsonEngine::new(), &SolveOptions::default());
        assert_eq!(targets[[1, PG_COLUMN]], 0.0);
        assert!(targets[[0, PG_COLUMN]] > 0.6);
    }
}
