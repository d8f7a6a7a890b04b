//! Schema-aware decoding control for text-to-SQL generation.
//!
//! The [`DecodingController`] wraps an external sequence generator and a
//! token codec. It cleans generated SQL with [`clean`], optionally consults a
//! [`ConstraintChecker`] per decoding step or on the final output, and falls
//! back to one unconstrained generation whenever post-processing fails.

pub mod checker;
pub mod collaborators;
pub mod config;
pub mod controller;
pub mod errors;
pub mod normalize;
pub mod verdict;

pub use checker::{ConstraintChecker, HeuristicChecker};
pub use collaborators::{
    EncodedQuestion, GenerationRequest, SequenceGenerator, StepConstraint, TokenCodec, TokenId,
};
pub use config::DecodingConfig;
pub use controller::{DecodingController, GenerationResult};
pub use errors::{CONSTRAINT_REJECTION, CheckError, DecodeError};
pub use normalize::{clean, exact_match, normalize};
pub use verdict::ValidityVerdict;
