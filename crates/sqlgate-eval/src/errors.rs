use sqlgate_decode::DecodeError;
use thiserror::Error;

/// Errors emitted by dataset plumbing and the evaluation engine.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),
    #[error("unknown database: {0}")]
    UnknownDatabase(String),
    #[error("decoding failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("schema error: {0}")]
    Core(#[from] sqlgate_core::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),
}
