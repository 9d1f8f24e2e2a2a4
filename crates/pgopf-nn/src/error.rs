use pgopf_core::PgopfError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NnError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    Shape {
        what: &'static str,
        expected: String,
        actual: String,
    },

    #[error("unknown model '{name}'; supported: {supported}")]
    UnknownModel { name: String, supported: String },
}

impl NnError {
    pub(crate) fn shape(
        what: &'static str,
        expected: impl std::fmt::Debug,
        actual: impl std::fmt::Debug,
    ) -> Self {
        NnError::Shape {
            what,
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }
}

impl From<NnError> for PgopfError {
    fn from(err: NnError) -> Self {
        match err {
            NnError::Shape { .. } => PgopfError::Validation(err.to_string()),
            other => PgopfError::Config(other.to_string()),
        }
    }
}

pub type NnResult<T> = Result<T, NnError>;
