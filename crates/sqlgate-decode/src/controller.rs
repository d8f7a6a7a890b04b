use std::sync::Arc;

use sqlgate_core::SchemaIndex;
use tracing::{debug, warn};

use crate::checker::{ConstraintChecker, HeuristicChecker};
use crate::collaborators::{
    EncodedQuestion, GenerationRequest, SequenceGenerator, StepConstraint, TokenCodec, TokenId,
};
use crate::config::DecodingConfig;
use crate::errors::DecodeError;
use crate::normalize::clean;
use crate::verdict::ValidityVerdict;

/// Padding marker that may survive decoding; text before its last
/// occurrence is not part of the partial SQL.
const PAD_MARKER: &str = "<pad>";

/// Output of one [`DecodingController::decode`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub tokens: Vec<TokenId>,
    pub text: String,
    /// True when post-processing failed and the raw retry output was used.
    pub used_fallback: bool,
    /// Failure kind of the first attempt when `used_fallback` is set.
    pub fallback_reason: Option<&'static str>,
}

/// Drives the external generator and post-processes its output.
///
/// The schema index is shared read-only, so one controller can serve any
/// number of threads when the generator and codec allow it.
pub struct DecodingController<G, C, K = HeuristicChecker> {
    generator: G,
    codec: C,
    checker: K,
    index: Arc<SchemaIndex>,
}

impl<G, C> DecodingController<G, C>
where
    G: SequenceGenerator,
    C: TokenCodec,
{
    /// Controller using the [`HeuristicChecker`].
    pub fn new(generator: G, codec: C, index: Arc<SchemaIndex>) -> Self {
        Self::with_checker(generator, codec, HeuristicChecker::new(), index)
    }
}

impl<G, C, K> DecodingController<G, C, K>
where
    G: SequenceGenerator,
    C: TokenCodec,
    K: ConstraintChecker,
{
    pub fn with_checker(generator: G, codec: C, checker: K, index: Arc<SchemaIndex>) -> Self {
        Self {
            generator,
            codec,
            checker,
            index,
        }
    }

    pub fn index(&self) -> &SchemaIndex {
        &self.index
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Generate, clean and re-encode one prediction.
    ///
    /// Any failure of the first attempt (generation, decoding, cleaning,
    /// output validation, re-encoding) is logged and followed by exactly one
    /// unconstrained retry whose raw output is returned with
    /// `used_fallback = true`. A failing retry is returned as the error.
    pub fn decode(
        &self,
        input: &EncodedQuestion,
        db_id: &str,
        config: &DecodingConfig,
    ) -> Result<GenerationResult, DecodeError> {
        match self.constrained_attempt(input, db_id, config) {
            Ok(result) => Ok(result),
            Err(err) => {
                warn!(
                    event = "decode_fallback",
                    kind = err.kind(),
                    db_id = %db_id,
                    error = %err,
                    "retrying generation without post-processing"
                );
                self.unconstrained_attempt(input, db_id, config, err.kind())
            }
        }
    }

    /// Check a decoded-so-far SQL string.
    pub fn step_text(&self, partial_sql: &str, db_id: &str) -> ValidityVerdict {
        self.checker.check(partial_sql, db_id, &self.index)
    }

    fn constrained_attempt(
        &self,
        input: &EncodedQuestion,
        db_id: &str,
        config: &DecodingConfig,
    ) -> Result<GenerationResult, DecodeError> {
        let constraint = config
            .per_step_masking
            .then_some(self as &dyn StepConstraint);
        let request = build_request(input, db_id, config, constraint);

        let tokens = non_empty(self.generator.generate(&request)?)?;
        let raw = self.codec.decode(&tokens, true)?;
        let text = clean(&raw);
        if text.is_empty() {
            return Err(DecodeError::EmptyOutput);
        }

        if config.validate_output && self.step_text(&text, db_id).is_reject() {
            return Err(DecodeError::Rejected {
                db_id: db_id.to_string(),
            });
        }

        let tokens = non_empty(self.codec.encode(&text)?)?;
        debug!(event = "decode_finished", db_id = %db_id, tokens = tokens.len());

        Ok(GenerationResult {
            tokens,
            text,
            used_fallback: false,
            fallback_reason: None,
        })
    }

    fn unconstrained_attempt(
        &self,
        input: &EncodedQuestion,
        db_id: &str,
        config: &DecodingConfig,
        reason: &'static str,
    ) -> Result<GenerationResult, DecodeError> {
        let request = build_request(input, db_id, config, None);
        let tokens = non_empty(self.generator.generate(&request)?)?;
        let text = self.codec.decode(&tokens, true)?;
        if text.trim().is_empty() {
            return Err(DecodeError::EmptyOutput);
        }

        Ok(GenerationResult {
            tokens,
            text,
            used_fallback: true,
            fallback_reason: Some(reason),
        })
    }
}

impl<G, C, K> StepConstraint for DecodingController<G, C, K>
where
    G: SequenceGenerator,
    C: TokenCodec,
    K: ConstraintChecker,
{
    fn step(&self, decoded: &[TokenId], db_id: &str) -> ValidityVerdict {
        match self.codec.decode(decoded, true) {
            Ok(text) => {
                let partial = text.rsplit(PAD_MARKER).next().unwrap_or_default().trim();
                self.step_text(partial, db_id)
            }
            Err(err) => {
                warn!(
                    event = "validity_check_failure",
                    db_id = %db_id,
                    error = %err,
                    "allowing all continuations"
                );
                ValidityVerdict::AllowAll
            }
        }
    }
}

fn build_request<'a>(
    input: &'a EncodedQuestion,
    db_id: &'a str,
    config: &DecodingConfig,
    constraint: Option<&'a dyn StepConstraint>,
) -> GenerationRequest<'a> {
    GenerationRequest {
        input_ids: &input.input_ids,
        attention_mask: &input.attention_mask,
        max_length: config.max_output_length,
        num_beams: config.beam_width,
        early_stopping: config.early_stopping,
        db_id,
        constraint,
    }
}

fn non_empty(tokens: Vec<TokenId>) -> Result<Vec<TokenId>, DecodeError> {
    if tokens.is_empty() {
        Err(DecodeError::EmptyOutput)
    } else {
        Ok(tokens)
    }
}
