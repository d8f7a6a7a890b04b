use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::EvalError;

/// One row of a prediction TSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub predicted_sql: String,
    pub ground_truth_sql: String,
}

/// One entry of the scored JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScoredPrediction {
    pub query: String,
    pub gold: String,
    pub db_id: String,
    pub exact_match: bool,
}

/// Write predictions with a `predicted_sql, ground_truth_sql` header.
pub fn write_predictions_tsv(path: &Path, rows: &[PredictionRow]) -> Result<(), EvalError> {
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

pub fn read_predictions_tsv(path: &Path) -> Result<Vec<PredictionRow>, EvalError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    for required in ["predicted_sql", "ground_truth_sql"] {
        if !headers.iter().any(|header| header == required) {
            return Err(EvalError::InvalidDataset(format!(
                "{}: missing '{required}' column",
                path.display()
            )));
        }
    }

    reader
        .deserialize::<PredictionRow>()
        .map(|row| row.map_err(EvalError::from))
        .collect()
}

/// Attach database ids (by position) to predictions, with `exact_match`
/// left false for a later [`crate::rescore`].
pub fn to_scored(
    rows: &[PredictionRow],
    db_ids: &[String],
) -> Result<Vec<ScoredPrediction>, EvalError> {
    if db_ids.len() < rows.len() {
        return Err(EvalError::InvalidDataset(format!(
            "{} predictions but only {} database ids",
            rows.len(),
            db_ids.len()
        )));
    }

    Ok(rows
        .iter()
        .zip(db_ids)
        .map(|(row, db_id)| ScoredPrediction {
            query: row.predicted_sql.clone(),
            gold: row.ground_truth_sql.clone(),
            db_id: db_id.clone(),
            exact_match: false,
        })
        .collect())
}

pub fn read_scored_json(path: &Path) -> Result<Vec<ScoredPrediction>, EvalError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

pub fn write_scored_json(path: &Path, entries: &[ScoredPrediction]) -> Result<(), EvalError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, serde_json::to_vec_pretty(entries)?)?;
    Ok(())
}
