//! Contracts of the external collaborators the controller drives.

use crate::errors::DecodeError;
use crate::verdict::ValidityVerdict;

/// Vocabulary id produced by the token codec.
pub type TokenId = u32;

/// Token ids and attention mask of one encoded model input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedQuestion {
    pub input_ids: Vec<TokenId>,
    pub attention_mask: Vec<u8>,
}

impl EncodedQuestion {
    /// Input with every position attended.
    pub fn new(input_ids: Vec<TokenId>) -> Self {
        let attention_mask = vec![1; input_ids.len()];
        Self {
            input_ids,
            attention_mask,
        }
    }
}

/// Arguments of one call into the external generator.
#[derive(Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub input_ids: &'a [TokenId],
    pub attention_mask: &'a [u8],
    pub max_length: usize,
    pub num_beams: usize,
    pub early_stopping: bool,
    pub db_id: &'a str,
    /// Per-step validity hook; `None` for unconstrained generation.
    pub constraint: Option<&'a dyn StepConstraint>,
}

/// Opaque, potentially expensive sequence generator (beam search lives here).
pub trait SequenceGenerator {
    /// Best output token sequence for the request.
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<Vec<TokenId>, DecodeError>;
}

/// Deterministic text/token codec shared with the generator.
pub trait TokenCodec {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>, DecodeError>;
    fn decode(&self, tokens: &[TokenId], skip_special: bool) -> Result<String, DecodeError>;
}

/// Validity hook a generator may consult before emitting each token.
///
/// `decoded` holds the ids produced so far for one hypothesis.
pub trait StepConstraint {
    fn step(&self, decoded: &[TokenId], db_id: &str) -> ValidityVerdict;
}
