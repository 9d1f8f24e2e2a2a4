//! Shared error type for the pgopf workspace.
//!
//! Crate-specific errors (Y-bus construction, power flow, feature construction,
//! network layers) convert into [`PgopfError`] so callers at API boundaries can
//! handle them uniformly.
//!
//! # Example
//!
//! ```ignore
//! use pgopf_core::{PgopfError, PgopfResult};
//!
//! fn prepare(path: &str) -> PgopfResult<()> {
//!     let network = load_case(path)?;
//!     build_features(&network)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for pgopf operations.
#[derive(Error, Debug)]
pub enum PgopfError {
    /// I/O errors (file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Case file parsing errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Power flow / numerical errors
    #[error("Solver error: {0}")]
    Solver(String),

    /// Invalid configuration (iteration counts, channel counts, model ids)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network structure errors (admittance construction, topology)
    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}

/// Convenience alias for results carrying [`PgopfError`].
pub type PgopfResult<T> = Result<T, PgopfError>;

impl From<anyhow::Error> for PgopfError {
    fn from(err: anyhow::Error) -> Self {
        PgopfError::Other(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for PgopfError {
    fn from(err: serde_json::Error) -> Self {
        PgopfError::Parse(err.to_string())
    }
}
