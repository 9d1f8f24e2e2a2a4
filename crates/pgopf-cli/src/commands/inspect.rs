//! Case summary: element counts, Y-bus sparsity and import diagnostics.

use anyhow::Result;
use pgopf_algo::SparseYBus;
use pgopf_core::NetworkStats;
use serde::Serialize;

use super::{load_case, write_json};

#[derive(Debug, Serialize)]
struct InspectReport {
    case: String,
    stats: NetworkStats,
    ybus_nonzeros: usize,
    warnings: Vec<String>,
}

pub fn handle(case: &str, json: bool) -> Result<()> {
    let import = load_case(case)?;
    let ybus = SparseYBus::from_network(&import.network)?;
    let report = InspectReport {
        case: case.to_string(),
        stats: import.network.stats(),
        ybus_nonzeros: ybus.nnz(),
        warnings: import
            .diagnostics
            .warnings()
            .map(|w| w.to_string())
            .collect(),
    };

    if json {
        return write_json(&report, None);
    }

    println!("Case: {}", report.case);
    println!("  {}", report.stats);
    println!(
        "  Y-bus: {n}x{n}, {} nonzeros",
        report.ybus_nonzeros,
        n = ybus.n_bus()
    );
    if report.warnings.is_empty() {
        println!("  No import warnings");
    } else {
        println!("  {} import warnings:", report.warnings.len());
        for w in &report.warnings {
            println!("    {w}");
        }
    }
    Ok(())
}
