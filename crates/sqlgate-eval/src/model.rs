use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sqlgate_decode::DecodingConfig;

use crate::errors::EvalError;
use crate::metrics::EvaluationMetrics;

/// Options for dataset evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluateOptions {
    /// Options handed to the decoding controller for every example.
    pub decoding: DecodingConfig,
    /// Directory receiving predictions, metrics and report.
    pub out_dir: PathBuf,
    /// Number of leading predictions logged for inspection.
    pub preview_examples: usize,
    /// Limit the number of misses listed in the report.
    pub max_examples: usize,
    /// Fixed run id; a random one is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

impl Default for EvaluateOptions {
    fn default() -> Self {
        Self {
            decoding: DecodingConfig::default(),
            out_dir: PathBuf::from("out/predictions"),
            preview_examples: 5,
            max_examples: 20,
            run_id: None,
        }
    }
}

impl EvaluateOptions {
    pub fn from_toml_str(contents: &str) -> Result<Self, EvalError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_toml_path(path: &Path) -> Result<Self, EvalError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}

/// One evaluated dataset row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatedExample {
    pub db_id: String,
    pub predicted_sql: String,
    pub ground_truth_sql: String,
    pub used_fallback: bool,
    /// Failure kind that triggered the fallback, if any.
    #[serde(default)]
    pub fallback_reason: Option<String>,
    pub exact_match: bool,
}

/// Result of a dataset evaluation.
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    pub out_dir: PathBuf,
    pub predictions_path: PathBuf,
    pub metrics_path: PathBuf,
    pub report_path: PathBuf,
    pub metrics: EvaluationMetrics,
    pub report: String,
    pub examples: Vec<EvaluatedExample>,
}
