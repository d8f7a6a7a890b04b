use thiserror::Error;

/// Core error type shared across sqlgate crates.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// A raw schema record is missing fields or references unknown tables.
    #[error("malformed schema record: {0}")]
    MalformedRecord(String),
}

/// Convenience alias for results returned by sqlgate crates.
pub type Result<T> = std::result::Result<T, Error>;
