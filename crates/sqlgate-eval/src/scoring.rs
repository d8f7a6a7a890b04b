use serde::{Deserialize, Serialize};
use sqlgate_decode::exact_match;

use crate::predictions::ScoredPrediction;

/// Outcome of an exact-match pass over scored predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub total: usize,
    pub exact_matches: usize,
    /// Entries flipped from `false` to `true` by this pass.
    pub updated: usize,
    pub accuracy_pct: f64,
}

/// Mark every entry whose normalized query equals its normalized gold.
///
/// Entries already marked as matches stay marked.
pub fn rescore(entries: &mut [ScoredPrediction]) -> ScoreSummary {
    let mut exact_matches = 0;
    let mut updated = 0;

    for entry in entries.iter_mut() {
        if exact_match(&entry.query, &entry.gold) {
            if !entry.exact_match {
                entry.exact_match = true;
                updated += 1;
            }
            exact_matches += 1;
        }
    }

    ScoreSummary {
        total: entries.len(),
        exact_matches,
        updated,
        accuracy_pct: percentage(exact_matches, entries.len()),
    }
}

/// First `limit` entries marked as exact matches.
pub fn sample_matches(entries: &[ScoredPrediction], limit: usize) -> Vec<&ScoredPrediction> {
    entries
        .iter()
        .filter(|entry| entry.exact_match)
        .take(limit)
        .collect()
}

pub(crate) fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}
