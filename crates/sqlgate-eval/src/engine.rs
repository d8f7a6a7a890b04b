use std::collections::BTreeMap;
use std::time::Instant;

use sqlgate_decode::{
    CONSTRAINT_REJECTION, ConstraintChecker, DecodingController, EncodedQuestion,
    SequenceGenerator, TokenCodec, exact_match,
};
use tracing::info;
use uuid::Uuid;

use crate::dataset::DatasetRow;
use crate::errors::EvalError;
use crate::metrics::{DatabaseMetrics, EvaluationMetrics, METRICS_VERSION, PerformanceMetrics};
use crate::model::{EvaluateOptions, EvaluatedExample, EvaluationResult};
use crate::predictions::{PredictionRow, write_predictions_tsv};
use crate::report::render_report;
use crate::scoring::percentage;

/// Runs a decoding controller over a dataset and writes run artifacts.
#[derive(Debug, Clone)]
pub struct EvaluationEngine {
    options: EvaluateOptions,
}

impl EvaluationEngine {
    pub fn new(options: EvaluateOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EvaluateOptions {
        &self.options
    }

    /// Predict every row in order.
    ///
    /// A row fails the run only when both decoding attempts fail; fallback
    /// predictions are kept and counted.
    pub fn run<G, C, K>(
        &self,
        controller: &DecodingController<G, C, K>,
        rows: &[DatasetRow],
    ) -> Result<EvaluationResult, EvalError>
    where
        G: SequenceGenerator,
        C: TokenCodec,
        K: ConstraintChecker,
    {
        let total_start = Instant::now();
        let started_at = chrono::Utc::now().to_rfc3339();
        let run_id = self
            .options
            .run_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        info!(event = "evaluation_started", run_id = %run_id, examples = rows.len());

        let decode_start = Instant::now();
        let mut examples = Vec::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            let input = EncodedQuestion::new(controller.codec().encode(&row.input)?);
            let result = controller.decode(&input, &row.db_id, &self.options.decoding)?;

            if idx < self.options.preview_examples {
                info!(
                    event = "prediction_preview",
                    index = idx,
                    input = %row.input,
                    predicted = %result.text,
                    ground_truth = %row.target,
                    used_fallback = result.used_fallback
                );
            }

            examples.push(EvaluatedExample {
                db_id: row.db_id.clone(),
                exact_match: exact_match(&result.text, &row.target),
                predicted_sql: result.text,
                ground_truth_sql: row.target.clone(),
                used_fallback: result.used_fallback,
                fallback_reason: result.fallback_reason.map(str::to_string),
            });
        }
        let decode_ms = decode_start.elapsed().as_millis();

        let exact_matches = examples.iter().filter(|e| e.exact_match).count();
        let fallbacks = examples.iter().filter(|e| e.used_fallback).count();
        let rejections = examples
            .iter()
            .filter(|e| e.fallback_reason.as_deref() == Some(CONSTRAINT_REJECTION))
            .count();

        let metrics = EvaluationMetrics {
            metrics_version: METRICS_VERSION.to_string(),
            run_id: run_id.clone(),
            started_at,
            decoding: self.options.decoding.clone(),
            examples: examples.len() as u64,
            fallbacks: fallbacks as u64,
            rejections: rejections as u64,
            exact_matches: exact_matches as u64,
            exact_match_pct: percentage(exact_matches, examples.len()),
            databases: database_metrics(&examples),
            performance: PerformanceMetrics {
                decode_ms,
                total_ms: total_start.elapsed().as_millis(),
            },
        };

        let out_dir = self.options.out_dir.clone();
        std::fs::create_dir_all(&out_dir)?;

        let predictions_path = out_dir.join("predictions.tsv");
        let prediction_rows = examples
            .iter()
            .map(|example| PredictionRow {
                predicted_sql: example.predicted_sql.clone(),
                ground_truth_sql: example.ground_truth_sql.clone(),
            })
            .collect::<Vec<_>>();
        write_predictions_tsv(&predictions_path, &prediction_rows)?;

        let metrics_path = out_dir.join("metrics.json");
        std::fs::write(&metrics_path, serde_json::to_vec_pretty(&metrics)?)?;

        let report = render_report(&metrics, &examples, self.options.max_examples);
        let report_path = out_dir.join("report.md");
        std::fs::write(&report_path, report.as_bytes())?;

        info!(
            event = "evaluation_finished",
            run_id = %run_id,
            examples = examples.len(),
            exact_matches = exact_matches,
            fallbacks = fallbacks,
            path = %predictions_path.display()
        );

        Ok(EvaluationResult {
            out_dir,
            predictions_path,
            metrics_path,
            report_path,
            metrics,
            report,
            examples,
        })
    }
}

fn database_metrics(examples: &[EvaluatedExample]) -> Vec<DatabaseMetrics> {
    let mut by_db: BTreeMap<&str, DatabaseMetrics> = BTreeMap::new();
    for example in examples {
        let entry = by_db
            .entry(example.db_id.as_str())
            .or_insert_with(|| DatabaseMetrics {
                db_id: example.db_id.clone(),
                ..DatabaseMetrics::default()
            });
        entry.examples += 1;
        entry.exact_matches += u64::from(example.exact_match);
        entry.fallbacks += u64::from(example.used_fallback);
    }
    by_db.into_values().collect()
}
