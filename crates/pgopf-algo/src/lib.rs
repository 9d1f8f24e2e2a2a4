//! # pgopf-algo: physics-guided feature construction
//!
//! Turns a network snapshot into the node features and physics parameters a
//! physics-guided graph convolution consumes.
//!
//! ## Pipeline
//!
//! 1. [`power_flow`]: bring the snapshot to a solved state (Newton-Raphson,
//!    one relaxed retry, warn and continue on failure)
//! 2. [`ybus`] / [`admittance`]: sparse Y-bus, split into self and mutual
//!    conductance and susceptance
//! 3. [`injections`]: per-bus demand and generator limits in per-unit
//! 4. [`features`]: K iterates of the [`aggregation`] kernel from flat start
//! 5. [`gcnn_input`]: bundle features with the physics parameters
//!
//! [`targets`] builds the matching `[pg, vm]` supervision from a solve.
//!
//! ```no_run
//! use pgopf_algo::{FeatureConstructionPipeline, NewtonRaphsonEngine, SolveOptions};
//! # fn demo(network: pgopf_core::Network) -> Result<(), pgopf_algo::FeatureError> {
//! let pipeline = FeatureConstructionPipeline::new(
//!     network,
//!     &NewtonRaphsonEngine::new(),
//!     &SolveOptions::default(),
//! )?;
//! let features = pipeline.stacked_features(4)?; // (n_buses, 8)
//! # Ok(())
//! # }
//! ```
//!
//! All vectors and matrices use the canonical bus order from
//! [`pgopf_core::Network::bus_order`].

pub mod admittance;
pub mod aggregation;
pub mod features;
pub mod gcnn_input;
pub mod injections;
pub mod power_flow;
pub mod targets;
pub mod ybus;

pub use admittance::{extract_admittance_components, initialize_voltage_features, AdmittanceComponents};
pub use aggregation::{
    aggregate_features, apply_power_limits, compute_alpha_beta, compute_alpha_beta_batch,
    compute_delta_lambda, compute_demand_delta_lambda, compute_pg_qg, normalize_features,
    PowerLimits,
};
pub use features::{construct_features_batch, FeatureConstructionPipeline, FeatureError, VoltageHistory};
pub use gcnn_input::{GcnnInput, GcnnInputSummary, PhysicsParams};
pub use injections::BusInjections;
pub use power_flow::{
    BusType, NewtonRaphsonEngine, PowerFlowEngine, PowerFlowError, PowerFlowReport, SolveOptions,
};
pub use targets::opf_targets;
pub use ybus::{SparseYBus, YBusError};
