use std::path::Path;

use serde::{Deserialize, Serialize};
use sqlgate_core::{SchemaIndex, flatten_schema};

use crate::errors::EvalError;

/// Database id recorded for dataset rows that carry none.
pub const UNKNOWN_DB_ID: &str = "unknown";

/// One benchmark example (`dev.json` / `train_spider.json` entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkExample {
    pub question: String,
    pub db_id: String,
    pub query: String,
}

/// One model-input row: prompt, reference SQL and database id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub input: String,
    pub target: String,
    #[serde(default = "unknown_db_id")]
    pub db_id: String,
}

fn unknown_db_id() -> String {
    UNKNOWN_DB_ID.to_string()
}

/// Load a JSON array of benchmark examples.
pub fn load_examples(path: &Path) -> Result<Vec<BenchmarkExample>, EvalError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Prompt fed to the model for one question.
pub fn model_input(question: &str, flattened_schema: &str) -> String {
    format!("question: {} schema: {}", question.trim(), flattened_schema.trim())
}

/// Pair every example with its flattened schema.
pub fn build_rows(
    examples: &[BenchmarkExample],
    index: &SchemaIndex,
) -> Result<Vec<DatasetRow>, EvalError> {
    examples
        .iter()
        .map(|example| {
            let schema = index
                .lookup(&example.db_id)
                .ok_or_else(|| EvalError::UnknownDatabase(example.db_id.clone()))?;
            Ok(DatasetRow {
                input: model_input(&example.question, &flatten_schema(schema)),
                target: example.query.trim().to_string(),
                db_id: example.db_id.clone(),
            })
        })
        .collect()
}

/// Write rows as TSV with an `input, target, db_id` header.
pub fn write_dataset_tsv(path: &Path, rows: &[DatasetRow]) -> Result<(), EvalError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a dataset TSV; files without a `db_id` column read as
/// [`UNKNOWN_DB_ID`].
pub fn read_dataset_tsv(path: &Path) -> Result<Vec<DatasetRow>, EvalError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for (line, record) in reader.deserialize::<DatasetRow>().enumerate() {
        let row = record.map_err(|err| {
            EvalError::InvalidDataset(format!("{} row {}: {err}", path.display(), line + 1))
        })?;
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn index() -> SchemaIndex {
        SchemaIndex::build(vec![json!({
            "db_id": "test_db",
            "table_names_original": ["users", "orders"],
            "column_names_original": [
                [-1, "*"], [0, "id"], [0, "name"], [1, "id"], [1, "user_id"], [1, "total"]
            ]
        })])
    }

    #[test]
    fn builds_prompt_from_question_and_flattened_schema() {
        let examples = vec![BenchmarkExample {
            question: " What are the names of all users? ".to_string(),
            db_id: "test_db".to_string(),
            query: "SELECT name FROM users ".to_string(),
        }];

        let rows = build_rows(&examples, &index()).expect("build rows");

        assert_eq!(
            rows[0].input,
            "question: What are the names of all users? schema: Tables: users(id, name), orders(id, user_id, total)"
        );
        assert_eq!(rows[0].target, "SELECT name FROM users");
        assert_eq!(rows[0].db_id, "test_db");
    }

    #[test]
    fn unknown_database_is_an_error() {
        let examples = vec![BenchmarkExample {
            question: "q".to_string(),
            db_id: "ghost".to_string(),
            query: "SELECT 1".to_string(),
        }];

        let err = build_rows(&examples, &index()).expect_err("ghost is unknown");
        assert!(matches!(err, EvalError::UnknownDatabase(db) if db == "ghost"));
    }
}
