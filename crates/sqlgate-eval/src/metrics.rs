use serde::{Deserialize, Serialize};
use sqlgate_decode::DecodingConfig;

/// Metrics contract version for evaluation runs.
pub const METRICS_VERSION: &str = "0.1";

/// Machine-readable metrics for an evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub metrics_version: String,
    pub run_id: String,
    pub started_at: String,
    pub decoding: DecodingConfig,
    pub examples: u64,
    pub fallbacks: u64,
    /// Fallbacks caused by the checker rejecting the cleaned output.
    #[serde(default)]
    pub rejections: u64,
    pub exact_matches: u64,
    pub exact_match_pct: f64,
    pub databases: Vec<DatabaseMetrics>,
    pub performance: PerformanceMetrics,
}

/// Per-database counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseMetrics {
    pub db_id: String,
    pub examples: u64,
    pub exact_matches: u64,
    pub fallbacks: u64,
}

/// Timings for the evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub decode_ms: u128,
    pub total_ms: u128,
}
