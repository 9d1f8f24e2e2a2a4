//! # pgopf-nn: physics-guided graph convolution
//!
//! Forward-only building blocks for OPF prediction models:
//!
//! - [`PhysicsGuidedConv`]: graph convolution that recomputes the aggregation
//!   kernel's physics terms against the network admittance
//! - [`Gcnn`]: stacked conv layers plus a dense prediction head
//! - [`ModelKind`] / [`ModelConfig`]: the closed set of architectures and
//!   their hyperparameters
//! - [`losses`]: supervised and correlative objectives
//! - [`metrics`]: threshold accuracy of `[pg, vm]` predictions
//!
//! Parameters are initialised from a caller-supplied RNG, so a seeded
//! `StdRng` gives reproducible models.
//!
//! ```no_run
//! use pgopf_nn::{ModelConfig, ModelKind};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let model = ModelKind::GcnnGao01.build(&ModelConfig::default(), 6, &mut rng)?;
//! println!("{} parameters", model.parameter_count());
//! # Ok::<(), pgopf_nn::NnError>(())
//! ```

pub mod error;
pub mod init;
pub mod layer;
pub mod linear;
pub mod losses;
pub mod metrics;
pub mod model;
pub mod registry;

pub use error::{NnError, NnResult};
pub use layer::{ConvParameters, PhysicsGuidedConv};
pub use linear::Linear;
pub use losses::{
    combined_loss, correlative_pg_loss, correlative_pg_loss_batch, implied_pg, supervised_mse,
};
pub use metrics::{probabilistic_accuracy, AccuracyReport};
pub use model::Gcnn;
pub use registry::{Model, ModelConfig, ModelKind};
