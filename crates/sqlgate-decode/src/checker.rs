use regex::Regex;
use sqlgate_core::SchemaIndex;
use tracing::{debug, warn};

use crate::errors::CheckError;
use crate::verdict::ValidityVerdict;

/// Pluggable validity check consulted by the decoding controller.
///
/// Implementations must not fail: anything they cannot decide is
/// [`ValidityVerdict::AllowAll`]. A stricter grammar-bound engine can return
/// [`ValidityVerdict::Allow`] masks without any change to the controller.
pub trait ConstraintChecker {
    fn check(&self, partial_sql: &str, db_id: &str, index: &SchemaIndex) -> ValidityVerdict;
}

impl<T: ConstraintChecker + ?Sized> ConstraintChecker for &T {
    fn check(&self, partial_sql: &str, db_id: &str, index: &SchemaIndex) -> ValidityVerdict {
        (**self).check(partial_sql, db_id, index)
    }
}

/// Captures `(` or a possibly qualified identifier whose parts may be
/// quoted with `"`, backticks or brackets (quoted parts may contain spaces).
const FROM_CLAUSE_PATTERN: &str =
    r#"(?i)\bfrom\b\s*(\(|(?:"[^"]*"|`[^`]*`|\[[^\]]*\]|[^\s,;()"`\[]+)+)"#;

/// Tokens after `FROM` that are never treated as table names.
const RESERVED_AFTER_FROM: [&str; 2] = ["(", "select"];

/// Lightweight, fail-open approximation of a grammar-and-schema check.
///
/// Rules, first decisive one wins:
/// 1. blank prefix: allow
/// 2. leading word other than `SELECT`: reject
/// 3. unbalanced parentheses: allow (the closing token is still to come)
/// 4. known database: the first `FROM <identifier>` must name one of its
///    tables, unless the identifier is `(` or `select`
#[derive(Debug, Clone)]
pub struct HeuristicChecker {
    from_clause: Result<Regex, regex::Error>,
}

impl Default for HeuristicChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl HeuristicChecker {
    pub fn new() -> Self {
        Self::with_from_pattern(FROM_CLAUSE_PATTERN)
    }

    /// Use a custom `FROM` pattern; capture group 1 must hold the identifier.
    ///
    /// An invalid pattern is not reported here. Every check that reaches the
    /// `FROM` rule then degrades to [`ValidityVerdict::AllowAll`].
    pub fn with_from_pattern(pattern: &str) -> Self {
        Self {
            from_clause: Regex::new(pattern),
        }
    }

    fn evaluate(
        &self,
        partial_sql: &str,
        db_id: &str,
        index: &SchemaIndex,
    ) -> Result<ValidityVerdict, CheckError> {
        let sql = partial_sql.trim();
        if sql.is_empty() {
            return Ok(ValidityVerdict::AllowAll);
        }

        if !leading_word(sql).eq_ignore_ascii_case("select") {
            return Ok(ValidityVerdict::Reject);
        }

        let opened = sql.matches('(').count();
        let closed = sql.matches(')').count();
        if opened != closed {
            return Ok(ValidityVerdict::AllowAll);
        }

        if !index.contains(db_id) {
            debug!(event = "schema_lookup_miss", db_id = %db_id);
            return Ok(ValidityVerdict::AllowAll);
        }

        let from_clause = self
            .from_clause
            .as_ref()
            .map_err(|err| CheckError::Pattern(err.to_string()))?;

        let Some(identifier) = from_clause
            .captures(sql)
            .and_then(|caps| caps.get(1))
            .map(|m| table_identifier(m.as_str()))
        else {
            return Ok(ValidityVerdict::AllowAll);
        };

        if RESERVED_AFTER_FROM.contains(&identifier.as_str()) || index.has_table(db_id, &identifier)
        {
            Ok(ValidityVerdict::AllowAll)
        } else {
            Ok(ValidityVerdict::Reject)
        }
    }
}

impl ConstraintChecker for HeuristicChecker {
    fn check(&self, partial_sql: &str, db_id: &str, index: &SchemaIndex) -> ValidityVerdict {
        match self.evaluate(partial_sql, db_id, index) {
            Ok(verdict) => verdict,
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

fn leading_word(sql: &str) -> &str {
    sql.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .unwrap_or_default()
}

/// Lower-cased table part of a `FROM` target, without quoting or qualifier.
fn table_identifier(raw: &str) -> String {
    let unqualified = raw.rsplit('.').next().unwrap_or(raw);
    let unquoted = unqualified.trim_matches(|c| matches!(c, '"' | '`' | '\'' | '[' | ']'));
    if unquoted.is_empty() {
        raw.to_lowercase()
    } else {
        unquoted.to_lowercase()
    }
}
