//! MATPOWER case import: parsed rows to [`Network`].
//!
//! - Bus `Pd`/`Qd` become one load per bus (skipped when both are zero).
//! - Bus `Gs`/`Bs` (MW/Mvar at 1 pu) become shunts in per-unit on `baseMVA`.
//! - Generators keep their limits, dispatch and voltage setpoint.
//! - Out-of-service generators and branches are kept with `status = false`.

use std::path::Path;

use anyhow::{Context, Result};
use pgopf_core::{Diagnostics, Network};

use super::matpower_parser::{parse_matpower_file, parse_matpower_string, MatpowerCase};
use crate::helpers::{BranchInput, BusInput, GenInput, LoadInput, NetworkBuilder, ShuntInput};

/// A built network together with the issues noticed while building it.
#[derive(Debug)]
pub struct ImportResult {
    pub network: Network,
    pub diagnostics: Diagnostics,
}

/// Load a MATPOWER `.m` file into a network, discarding warnings.
pub fn load_matpower_network(m_file: &Path) -> Result<Network> {
    Ok(parse_matpower(m_file)?.network)
}

/// Load a MATPOWER `.m` file and keep the import diagnostics.
pub fn parse_matpower(m_file: &Path) -> Result<ImportResult> {
    let case = parse_matpower_file(m_file)?;
    build_network_from_matpower_case(&case)
        .with_context(|| format!("building network from {}", m_file.display()))
}

/// Build a network from MATPOWER case text held in memory.
pub fn network_from_matpower_str(content: &str) -> Result<ImportResult> {
    let case = parse_matpower_string(content)?;
    build_network_from_matpower_case(&case)
}

pub fn build_network_from_matpower_case(case: &MatpowerCase) -> Result<ImportResult> {
    anyhow::ensure!(
        case.base_mva > 0.0,
        "mpc.baseMVA must be positive, got {}",
        case.base_mva
    );
    let mut builder = NetworkBuilder::with_capacity(case.base_mva, case.bus.len());

    for bus in &case.bus {
        builder.add_bus(BusInput {
            id: bus.bus_i,
            base_kv: bus.base_kv,
            voltage_pu: bus.vm,
            angle_rad: bus.va.to_radians(),
            vmin_pu: Some(bus.vmin),
            vmax_pu: Some(bus.vmax),
        });
    }

    for bus in &case.bus {
        if bus.pd != 0.0 || bus.qd != 0.0 {
            builder.add_load(LoadInput {
                bus_id: bus.bus_i,
                active_power_mw: bus.pd,
                reactive_power_mvar: bus.qd,
            });
        }
        if bus.gs != 0.0 || bus.bs != 0.0 {
            builder.add_shunt(ShuntInput {
                bus_id: bus.bus_i,
                gs_pu: bus.gs / case.base_mva,
                bs_pu: bus.bs / case.base_mva,
            });
        }
    }

    for gen in &case.gen {
        builder.add_gen(GenInput {
            bus_id: gen.gen_bus,
            pg: gen.pg,
            qg: gen.qg,
            pmin: gen.pmin,
            pmax: gen.pmax,
            qmin: gen.qmin,
            qmax: gen.qmax,
            voltage_setpoint_pu: Some(gen.vg),
            in_service: gen.gen_status > 0,
        });
    }

    for br in &case.branch {
        builder.add_branch(BranchInput {
            from_bus: br.f_bus,
            to_bus: br.t_bus,
            resistance: br.br_r,
            reactance: br.br_x,
            charging_b: br.br_b,
            // MATPOWER uses 0 for "no transformer"
            tap_ratio: if br.tap == 0.0 { 1.0 } else { br.tap },
            phase_shift_rad: br.shift.to_radians(),
            rate_mva: (br.rate_a > 0.0).then_some(br.rate_a),
            in_service: br.br_status > 0,
        });
    }

    let (network, diagnostics) = builder.build();
    Ok(ImportResult {
        network,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHUNT_CASE: &str = r#"
mpc.baseMVA = 50;
mpc.bus = [
	1	3	0	0	0	0	1	1	0	138	1	1.1	0.9;
	2	1	10	4	5	-25	1	1	0	138	1	1.1	0.9;
];
mpc.gen = [
	1	0	0	10	-10	1.0	50	1	30	0;
	2	0	0	10	-10	1.0	50	0	30	0;
];
mpc.branch = [
	1	2	0.01	0.1	0	0	0	0	0.98	2	1	-360	360;
	1	2	0.01	0.1	0	0	0	0	0	0	0	-360	360;
];
"#;

    #[test]
    fn test_shunts_converted_to_per_unit() {
        let result = network_from_matpower_str(SHUNT_CASE).unwrap();
        let shunts = result.network.shunts();
        assert_eq!(shunts.len(), 1);
        assert!((shunts[0].gs_pu - 0.1).abs() < 1e-12);
        assert!((shunts[0].bs_pu + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_service_elements_kept() {
        let network = network_from_matpower_str(SHUNT_CASE).unwrap().network;
        let branches = network.branches();
        assert_eq!(branches.len(), 2);
        assert_eq!(branches.iter().filter(|b| b.status).count(), 1);
        assert_eq!(network.generators().iter().filter(|g| g.status).count(), 1);
    }

    #[test]
    fn test_tap_and_shift() {
        let network = network_from_matpower_str(SHUNT_CASE).unwrap().network;
        let tapped = network
            .branches()
            .into_iter()
            .find(|b| b.status)
            .unwrap()
            .clone();
        assert_eq!(tapped.tap_ratio, 0.98);
        assert!((tapped.phase_shift.to_degrees() - 2.0).abs() < 1e-12);
        let plain = network.branches().into_iter().find(|b| !b.status).unwrap();
        assert_eq!(plain.tap_ratio, 1.0);
    }

    #[test]
    fn test_rejects_non_positive_base() {
        let text = SHUNT_CASE.replace("mpc.baseMVA = 50;", "mpc.baseMVA = 0;");
        assert!(network_from_matpower_str(&text).is_err());
    }
}
