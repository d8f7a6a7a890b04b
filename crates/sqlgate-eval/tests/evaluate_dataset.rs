use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sqlgate_core::SchemaIndex;
use sqlgate_decode::{
    DecodeError, DecodingController, GenerationRequest, SequenceGenerator, TokenCodec, TokenId,
};
use sqlgate_eval::{
    BenchmarkExample, EvaluateOptions, EvaluationEngine, UNKNOWN_DB_ID, build_rows,
    read_dataset_tsv, read_predictions_tsv, rescore, to_scored, write_dataset_tsv,
};

struct CharCodec;

impl TokenCodec for CharCodec {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>, DecodeError> {
        Ok(text.chars().map(|c| c as TokenId).collect())
    }

    fn decode(&self, tokens: &[TokenId], _skip_special: bool) -> Result<String, DecodeError> {
        tokens
            .iter()
            .map(|id| char::from_u32(*id).ok_or_else(|| DecodeError::Codec(format!("bad id {id}"))))
            .collect()
    }
}

/// Answers by question text; questions listed in `flaky` fail on first call.
struct CannedGenerator {
    answers: HashMap<String, String>,
    flaky: Mutex<Vec<String>>,
}

impl SequenceGenerator for CannedGenerator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<Vec<TokenId>, DecodeError> {
        let input = CharCodec.decode(request.input_ids, true)?;
        let question = input
            .strip_prefix("question: ")
            .and_then(|rest| rest.split(" schema: ").next())
            .unwrap_or_default()
            .to_string();

        let mut flaky = self.flaky.lock().unwrap();
        if let Some(pos) = flaky.iter().position(|q| *q == question) {
            flaky.remove(pos);
            return Err(DecodeError::Generation("transient".to_string()));
        }

        let answer = self
            .answers
            .get(&question)
            .ok_or_else(|| DecodeError::Generation(format!("no answer for {question}")))?;
        CharCodec.encode(answer)
    }
}

fn fixture_index() -> Arc<SchemaIndex> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../sqlgate-core/tests/fixtures/tables.json");
    Arc::new(SchemaIndex::from_path(&path).expect("load fixture tables"))
}

fn temp_out_dir(label: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("sqlgate_eval_{label}_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp out dir");
    dir
}

fn example(question: &str, db_id: &str, query: &str) -> BenchmarkExample {
    BenchmarkExample {
        question: question.to_string(),
        db_id: db_id.to_string(),
        query: query.to_string(),
    }
}

fn generator(flaky: &[&str]) -> CannedGenerator {
    let answers = [
        ("How many students?", "select count( * ) from student"),
        ("Names of users?", "select name from users"),
        ("Course titles?", "select id from course"),
    ]
    .into_iter()
    .map(|(q, a)| (q.to_string(), a.to_string()))
    .collect();

    CannedGenerator {
        answers,
        flaky: Mutex::new(flaky.iter().map(|q| q.to_string()).collect()),
    }
}

fn examples() -> Vec<BenchmarkExample> {
    vec![
        example("How many students?", "school", "SELECT count(*) FROM student"),
        example("Names of users?", "test_db", "SELECT name FROM users"),
        example("Course titles?", "school", "SELECT title FROM course"),
    ]
}

#[test]
fn evaluation_writes_predictions_metrics_and_report() {
    let index = fixture_index();
    let rows = build_rows(&examples(), &index).expect("build rows");
    let controller = DecodingController::new(generator(&["Names of users?"]), CharCodec, index);

    let out_dir = temp_out_dir("run");
    let options = EvaluateOptions {
        out_dir: out_dir.clone(),
        run_id: Some("fixed".to_string()),
        ..EvaluateOptions::default()
    };
    let result = EvaluationEngine::new(options)
        .run(&controller, &rows)
        .expect("evaluate");

    assert_eq!(result.metrics.run_id, "fixed");
    assert_eq!(result.metrics.examples, 3);
    assert_eq!(result.metrics.exact_matches, 2);
    assert_eq!(result.metrics.fallbacks, 1);
    assert_eq!(result.examples[0].predicted_sql, "SELECT COUNT(*) FROM student");
    assert!(result.examples[1].used_fallback);
    assert_eq!(result.examples[1].fallback_reason.as_deref(), Some("generation_failure"));
    assert_eq!(result.metrics.rejections, 0);
    assert_eq!(result.examples[1].predicted_sql, "select name from users");

    let school = &result.metrics.databases[0];
    assert_eq!((school.db_id.as_str(), school.examples, school.exact_matches), ("school", 2, 1));

    let predictions = read_predictions_tsv(&result.predictions_path).expect("read predictions");
    assert_eq!(predictions.len(), 3);
    assert_eq!(predictions[2].ground_truth_sql, "SELECT title FROM course");

    let metrics: serde_json::Value =
        serde_json::from_slice(&fs::read(&result.metrics_path).expect("metrics.json"))
            .expect("parse metrics");
    assert_eq!(metrics["fallbacks"], 1);
    assert!(fs::read_to_string(&result.report_path).unwrap().contains("## Databases"));
}

#[test]
fn dataset_round_trips_through_tsv_and_scores_by_exact_match() {
    let index = fixture_index();
    let out_dir = temp_out_dir("pipeline");
    let dataset_path = out_dir.join("dev.tsv");

    let rows = build_rows(&examples(), &index).expect("build rows");
    write_dataset_tsv(&dataset_path, &rows).expect("write dataset");
    let reread = read_dataset_tsv(&dataset_path).expect("read dataset");
    assert_eq!(reread, rows);

    let controller = DecodingController::new(generator(&[]), CharCodec, Arc::clone(&index));
    let options = EvaluateOptions {
        out_dir: out_dir.join("predictions"),
        ..EvaluateOptions::default()
    };
    let result = EvaluationEngine::new(options)
        .run(&controller, &reread)
        .expect("evaluate");

    let predictions = read_predictions_tsv(&result.predictions_path).expect("read predictions");
    let db_ids = examples().into_iter().map(|e| e.db_id).collect::<Vec<_>>();
    let mut scored = to_scored(&predictions, &db_ids).expect("convert");
    let summary = rescore(&mut scored);

    assert_eq!(summary.exact_matches as u64, result.metrics.exact_matches);
    assert_eq!(summary.updated, summary.exact_matches);
    assert_eq!(scored[1].db_id, "test_db");
}

#[test]
fn dataset_without_db_id_column_reads_as_unknown() {
    let out_dir = temp_out_dir("legacy");
    let path = out_dir.join("legacy.tsv");
    fs::write(&path, "input\ttarget\nquestion: q schema: Tables: t(a)\tSELECT a FROM t\n")
        .expect("write legacy tsv");

    let rows = read_dataset_tsv(&path).expect("read legacy dataset");

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].db_id, UNKNOWN_DB_ID);
    assert_eq!(rows[0].target, "SELECT a FROM t");
}

#[test]
fn double_generation_failure_aborts_the_run() {
    let index = fixture_index();
    let rows = build_rows(&[example("Unanswerable?", "school", "SELECT 1")], &index)
        .expect("build rows");
    let controller = DecodingController::new(generator(&[]), CharCodec, index);
    let options = EvaluateOptions {
        out_dir: temp_out_dir("fatal"),
        ..EvaluateOptions::default()
    };

    let err = EvaluationEngine::new(options)
        .run(&controller, &rows)
        .expect_err("no answer on either attempt");

    assert!(matches!(err, sqlgate_eval::EvalError::Decode(DecodeError::Generation(_))));
}
