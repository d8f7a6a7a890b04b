use serde::{Deserialize, Serialize};

/// Decoding options, passed through to the generator verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodingConfig {
    /// Maximum output length in tokens.
    pub max_output_length: usize,
    /// Number of beams the generator keeps.
    pub beam_width: usize,
    /// Stop once every beam has produced a terminator.
    pub early_stopping: bool,
    /// Hand the controller to the generator as a per-step constraint.
    pub per_step_masking: bool,
    /// Reject cleaned outputs the checker rejects, forcing the fallback.
    pub validate_output: bool,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            max_output_length: 100,
            beam_width: 4,
            early_stopping: true,
            per_step_masking: false,
            validate_output: false,
        }
    }
}
