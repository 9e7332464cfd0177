use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid filter: {reason}")]
    InvalidFilter { reason: String },

    #[error("Malformed column '{column}' in dispute '{dispute_id}': {value}")]
    MalformedColumn {
        dispute_id: String,
        column: &'static str,
        value: String,
    },

    #[error("Unknown external status '{0}'")]
    UnknownStatus(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type RecoveryResult<T> = Result<T, RecoveryError>;
