use thiserror::Error;

/// [`DecodeError::kind`] of an output rejected by the constraint checker.
pub const CONSTRAINT_REJECTION: &str = "constraint_rejection";

/// Failures raised while producing a prediction.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("codec failed: {0}")]
    Codec(String),
    #[error("generator returned an empty sequence")]
    EmptyOutput,
    /// The checker rejected the cleaned output of a generation.
    #[error("output rejected by constraint checker for database '{db_id}'")]
    Rejected { db_id: String },
}

impl DecodeError {
    /// Stable name of the failure kind used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::Generation(_) => "generation_failure",
            DecodeError::Codec(_) => "codec_failure",
            DecodeError::EmptyOutput => "empty_output",
            DecodeError::Rejected { .. } => CONSTRAINT_REJECTION,
        }
    }
}

/// Internal failure of a constraint checker.
///
/// Never surfaces to callers of [`crate::ConstraintChecker::check`]; it is
/// logged and turned into [`crate::ValidityVerdict::AllowAll`].
#[derive(Debug, Clone, Error)]
pub enum CheckError {
    #[error("invalid pattern: {0}")]
    Pattern(String),
}
