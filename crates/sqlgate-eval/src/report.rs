use crate::metrics::EvaluationMetrics;
use crate::model::EvaluatedExample;

/// Render a deterministic markdown report from metrics and predictions.
pub fn render_report(
    metrics: &EvaluationMetrics,
    examples: &[EvaluatedExample],
    max_examples: usize,
) -> String {
    let mut lines = Vec::new();

    lines.push("# sqlgate Evaluation Report".to_string());
    lines.push(String::new());
    lines.push("## Run summary".to_string());
    lines.push(format!("- run_id: {}", metrics.run_id));
    lines.push(format!("- started_at: {}", metrics.started_at));
    lines.push(format!("- examples: {}", metrics.examples));
    lines.push(format!(
        "- exact_match: {} ({:.2}%)",
        metrics.exact_matches, metrics.exact_match_pct
    ));
    lines.push(format!(
        "- fallbacks: {} (schema rejections: {})",
        metrics.fallbacks, metrics.rejections
    ));
    lines.push(format!(
        "- decoding: max_output_length={} beam_width={} early_stopping={} per_step_masking={} validate_output={}",
        metrics.decoding.max_output_length,
        metrics.decoding.beam_width,
        metrics.decoding.early_stopping,
        metrics.decoding.per_step_masking,
        metrics.decoding.validate_output
    ));
    lines.push(String::new());

    lines.push("## Databases".to_string());
    lines.push("| db_id | examples | exact_matches | fallbacks |".to_string());
    lines.push("| --- | --- | --- | --- |".to_string());
    for db in &metrics.databases {
        lines.push(format!(
            "| {} | {} | {} | {} |",
            db.db_id, db.examples, db.exact_matches, db.fallbacks
        ));
    }
    lines.push(String::new());

    let misses = examples
        .iter()
        .filter(|example| !example.exact_match)
        .take(max_examples)
        .collect::<Vec<_>>();
    if !misses.is_empty() {
        lines.push("## Top misses".to_string());
        for example in misses {
            let fallback = if example.used_fallback {
                " (fallback)"
            } else {
                ""
            };
            lines.push(format!(
                "- {}{}: predicted `{}` expected `{}`",
                example.db_id, fallback, example.predicted_sql, example.ground_truth_sql
            ));
        }
        lines.push(String::new());
    }

    lines.push("## Recommendations".to_string());
    lines.extend(recommendations(metrics));
    lines.join("\n")
}

fn recommendations(metrics: &EvaluationMetrics) -> Vec<String> {
    let mut lines = Vec::new();
    if metrics.fallbacks > 0 {
        lines.push("- inspect logs for decode_fallback events; fallbacks skip cleaning.".to_string());
    }
    if metrics.rejections > 0 {
        lines.push(format!(
            "- {} outputs were rejected against the schema; compare with validate_output off.",
            metrics.rejections
        ));
    }
    if metrics.examples > 0 && metrics.exact_matches == 0 {
        lines.push("- no exact matches; check the prompt format and model checkpoint.".to_string());
    }
    if lines.is_empty() {
        lines.push("- no fallbacks detected; compare metrics across runs for drift.".to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{DatabaseMetrics, METRICS_VERSION, PerformanceMetrics};

    fn metrics(fallbacks: u64, rejections: u64) -> EvaluationMetrics {
        EvaluationMetrics {
            metrics_version: METRICS_VERSION.to_string(),
            run_id: "run-1".to_string(),
            started_at: "2024-01-01T00:00:00+00:00".to_string(),
            decoding: Default::default(),
            examples: 2,
            fallbacks,
            rejections,
            exact_matches: 1,
            exact_match_pct: 50.0,
            databases: vec![DatabaseMetrics {
                db_id: "school".to_string(),
                examples: 2,
                exact_matches: 1,
                fallbacks,
            }],
            performance: PerformanceMetrics {
                decode_ms: 1,
                total_ms: 2,
            },
        }
    }

    fn example(exact_match: bool, used_fallback: bool) -> EvaluatedExample {
        EvaluatedExample {
            db_id: "school".to_string(),
            predicted_sql: "SELECT a FROM t".to_string(),
            ground_truth_sql: "SELECT b FROM t".to_string(),
            used_fallback,
            fallback_reason: used_fallback.then(|| "generation_failure".to_string()),
            exact_match,
        }
    }

    #[test]
    fn lists_misses_and_database_rows() {
        let report =
            render_report(&metrics(1, 0), &[example(true, false), example(false, true)], 10);

        assert!(report.contains("- exact_match: 1 (50.00%)"));
        assert!(report.contains("| school | 2 | 1 | 1 |"));
        assert!(report.contains("- school (fallback): predicted `SELECT a FROM t`"));
        assert!(report.contains("decode_fallback"));
    }

    #[test]
    fn schema_rejection_advice_follows_rejection_count() {
        let mut validated = metrics(1, 0);
        validated.decoding.validate_output = true;
        let report = render_report(&validated, &[example(false, true)], 10);
        assert!(report.contains("- fallbacks: 1 (schema rejections: 0)"));
        assert!(!report.contains("rejected against the schema"));

        let mut rejected = metrics(2, 1);
        rejected.decoding.validate_output = true;
        let report = render_report(&rejected, &[example(false, true)], 10);
        assert!(report.contains("- 1 outputs were rejected against the schema"));
    }

    #[test]
    fn clean_run_recommends_drift_comparison() {
        let report = render_report(&metrics(0, 0), &[example(true, false)], 10);

        assert!(!report.contains("## Top misses"));
        assert!(report.contains("compare metrics across runs"));
    }
}
