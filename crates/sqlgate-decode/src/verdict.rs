use std::collections::BTreeSet;

use crate::collaborators::TokenId;

/// Outcome of checking a partial SQL string against a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidityVerdict {
    /// No constraint known; continue unconstrained.
    AllowAll,
    /// The prefix is structurally invalid; no continuation is allowed.
    Reject,
    /// Only these next tokens are permitted.
    Allow(BTreeSet<TokenId>),
}

impl ValidityVerdict {
    pub fn is_reject(&self) -> bool {
        matches!(self, ValidityVerdict::Reject)
    }

    /// Whether `token` may be emitted next under this verdict.
    pub fn permits(&self, token: TokenId) -> bool {
        match self {
            ValidityVerdict::AllowAll => true,
            ValidityVerdict::Reject => false,
            ValidityVerdict::Allow(tokens) => tokens.contains(&token),
        }
    }

    /// The token mask for a generator, `None` meaning no mask.
    pub fn allowed_tokens(&self) -> Option<&BTreeSet<TokenId>> {
        match self {
            ValidityVerdict::Allow(tokens) => Some(tokens),
            _ => None,
        }
    }
}
