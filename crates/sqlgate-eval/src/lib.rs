//! Dataset plumbing and evaluation for sqlgate.
//!
//! Builds model-input TSV files from benchmark examples, drives a
//! `DecodingController` over a dataset, and converts and rescores
//! prediction files by exact match.

pub mod dataset;
pub mod engine;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod predictions;
pub mod report;
pub mod scoring;

pub use dataset::{
    BenchmarkExample, DatasetRow, UNKNOWN_DB_ID, build_rows, load_examples, model_input,
    read_dataset_tsv, write_dataset_tsv,
};
pub use engine::EvaluationEngine;
pub use errors::EvalError;
pub use metrics::{DatabaseMetrics, EvaluationMetrics, METRICS_VERSION, PerformanceMetrics};
pub use model::{EvaluateOptions, EvaluatedExample, EvaluationResult};
pub use predictions::{
    PredictionRow, ScoredPrediction, read_predictions_tsv, read_scored_json, to_scored,
    write_predictions_tsv, write_scored_json,
};
pub use report::render_report;
pub use scoring::{ScoreSummary, rescore, sample_matches};
