use std::path::Path;

use anyhow::Result;
use pgopf_algo::{
    FeatureConstructionPipeline, GcnnInput, GcnnInputSummary, NewtonRaphsonEngine, SolveOptions,
};
use pgopf_core::SolveState;
use serde::Serialize;
use tracing::info;

use super::{load_case, matrix_rows, write_json};

#[derive(Debug, Serialize)]
struct FeatureReport {
    case: String,
    solve_state: SolveState,
    summary: GcnnInputSummary,
    /// `(n_buses, 2K)` rows in canonical bus order
    features: Vec<Vec<f64>>,
}

pub fn handle(
    case: &str,
    num_iterations: usize,
    no_solve: bool,
    out: Option<&Path>,
) -> Result<()> {
    let network = load_case(case)?.network;
    let pipeline = if no_solve {
        FeatureConstructionPipeline::without_solve(network)?
    } else {
        FeatureConstructionPipeline::new(
            network,
            &NewtonRaphsonEngine::new(),
            &SolveOptions::default(),
        )?
    };

    let input = GcnnInput::from_pipeline(&pipeline, num_iterations)?;
    let summary = input.summary();
    info!(%summary, "features built");

    let report = FeatureReport {
        case: case.to_string(),
        solve_state: pipeline.network().solve_state.clone(),
        summary,
        features: matrix_rows(&input.node_features),
    };
    write_json(&report, out)
}
