use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{Column, Schema};
use crate::NO_TABLE;

/// One entry of a `tables.json` file as published with the benchmark.
///
/// Only the fields the decoder consumes are modelled; anything else in the
/// entry (column types, keys, display names) is ignored on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SchemaRecord {
    pub db_id: String,
    pub table_names_original: Vec<String>,
    /// `(owning table index, column name)`; owner `-1` means no table.
    pub column_names_original: Vec<(i64, String)>,
}

impl SchemaRecord {
    /// Check that every column owner is `-1` or a position in the table list.
    pub fn validate(&self) -> Result<()> {
        self.resolve_owners().map(|_| ())
    }

    /// Convert the raw record into a [`Schema`], checking column owners.
    pub fn into_schema(self) -> Result<Schema> {
        let owners = self.resolve_owners()?;
        let columns = owners
            .into_iter()
            .zip(self.column_names_original)
            .map(|(table, (_, name))| Column { table, name })
            .collect();

        Ok(Schema {
            id: self.db_id,
            tables: self.table_names_original,
            columns,
        })
    }

    fn resolve_owners(&self) -> Result<Vec<Option<usize>>> {
        let table_count = self.table_names_original.len();
        self.column_names_original
            .iter()
            .enumerate()
            .map(|(position, (owner, name))| match *owner {
                NO_TABLE => Ok(None),
                idx if idx >= 0 && (idx as usize) < table_count => Ok(Some(idx as usize)),
                idx => Err(Error::MalformedRecord(format!(
                    "{}: column {position} ('{name}') references table {idx} of {table_count}",
                    self.db_id
                ))),
            })
            .collect()
    }
}

/// Read the top-level JSON array of a `tables.json` file without
/// interpreting its entries.
pub fn read_schema_values(path: &Path) -> Result<Vec<serde_json::Value>> {
    let contents = std::fs::read_to_string(path)?;
    match serde_json::from_str(&contents)? {
        serde_json::Value::Array(values) => Ok(values),
        _ => Err(Error::MalformedRecord(format!(
            "{}: expected a JSON array of schema records",
            path.display()
        ))),
    }
}

/// Load every record of a `tables.json` file, failing on the first
/// malformed entry (missing fields or a column owner outside the table list).
pub fn load_schema_records(path: &Path) -> Result<Vec<SchemaRecord>> {
    read_schema_values(path)?
        .into_iter()
        .map(|value| -> Result<SchemaRecord> {
            let record: SchemaRecord = serde_json::from_value(value)?;
            record.validate()?;
            Ok(record)
        })
        .collect()
}
