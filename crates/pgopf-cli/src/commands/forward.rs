//! Forward pass of an untrained model, for checking wiring and shapes.

use std::path::Path;

use anyhow::{Context, Result};
use pgopf_algo::{FeatureConstructionPipeline, GcnnInput, NewtonRaphsonEngine};
use pgopf_cli::ExperimentConfig;
use pgopf_nn::ModelKind;
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use tracing::info;

use super::{load_case, matrix_rows, write_json};

#[derive(Debug, Serialize)]
struct ForwardReport {
    experiment: String,
    case: String,
    model: ModelKind,
    seed: u64,
    parameters: usize,
    /// `(n_buses, output_dim)` rows, `[P_G, V_G]` per bus by default
    predictions: Vec<Vec<f64>>,
}

pub fn handle(
    case: &str,
    config_path: Option<&Path>,
    seed: Option<u64>,
    out: Option<&Path>,
) -> Result<()> {
    let config = match config_path {
        Some(path) => ExperimentConfig::load(path)?,
        None => ExperimentConfig::default(),
    };
    let seed = seed.unwrap_or(config.seed);

    let network = load_case(case)?.network;
    let pipeline = FeatureConstructionPipeline::new(
        network,
        &NewtonRaphsonEngine::new(),
        &config.features.solve,
    )?;
    let input = GcnnInput::from_pipeline(&pipeline, config.features.num_iterations)?;

    let mut rng = StdRng::seed_from_u64(seed);
    let model = config
        .model
        .name
        .build(&config.model, input.n_buses, &mut rng)
        .with_context(|| format!("building model {}", config.model.name))?;
    info!(
        model = %config.model.name,
        parameters = model.parameter_count(),
        seed,
        "model initialised"
    );

    let predictions = model.forward(&input.node_features, &input.physics())?;
    let report = ForwardReport {
        experiment: config.name.clone(),
        case: case.to_string(),
        model: model.kind(),
        seed,
        parameters: model.parameter_count(),
        predictions: matrix_rows(&predictions),
    };
    write_json(&report, out)
}
