//! # pgopf-io: case import
//!
//! Turns MATPOWER case files into [`pgopf_core::Network`] snapshots and ships
//! a small set of reference cases for tests and demos.
//!
//! ```no_run
//! use std::path::Path;
//!
//! let network = pgopf_io::load_matpower_network(Path::new("case6ww.m"))?;
//! println!("{}", network.stats());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cases;
pub mod helpers;
pub mod importers;

pub use cases::{builtin_case, builtin_case_text, case6ww, BUILTIN_CASES, CASE6WW};
pub use importers::{
    load_matpower_network, network_from_matpower_str, parse_matpower, ImportResult,
};
