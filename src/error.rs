use crate::schema::Period;
use thiserror::Error;

/// Error type returned by the read collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid period {0}: end of period must not precede its start")]
    InvalidPeriod(Period),

    #[error("Failed to read {entity} {id}: {source}")]
    UpstreamFailure {
        entity: &'static str,
        id: String,
        #[source]
        source: BoxError,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid report field '{field}': {details}")]
    InvalidReport { field: &'static str, details: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Period parse error: {0}")]
    PeriodParse(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl EngineError {
    pub fn upstream(entity: &'static str, id: impl ToString, source: BoxError) -> Self {
        Self::UpstreamFailure {
            entity,
            id: id.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
