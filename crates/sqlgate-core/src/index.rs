use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::record::{SchemaRecord, read_schema_values};
use crate::schema::Schema;

/// A raw entry dropped while building the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Position of the entry in the input sequence.
    pub position: usize,
    pub reason: String,
}

/// Immutable lookup of schemas by database id.
///
/// Built once at startup and shared by reference (or `Arc`) with every
/// decoding call. There is no mutation after [`SchemaIndex::build`], so
/// concurrent readers need no synchronization.
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    schemas: HashMap<String, Schema>,
    table_names: HashMap<String, HashSet<String>>,
    skipped: Vec<SkippedRecord>,
    empty: HashSet<String>,
}

impl SchemaIndex {
    /// Build the index from raw `tables.json` entries.
    ///
    /// Malformed entries are logged and skipped. A database id seen twice
    /// keeps the later entry.
    pub fn build<I>(records: I) -> Self
    where
        I: IntoIterator<Item = serde_json::Value>,
    {
        let mut index = Self::default();
        for (position, value) in records.into_iter().enumerate() {
            let parsed = serde_json::from_value::<SchemaRecord>(value)
                .map_err(Error::from)
                .and_then(SchemaRecord::into_schema);
            index.insert_or_skip(position, parsed);
        }
        index
    }

    /// Build the index from already-typed records.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = SchemaRecord>,
    {
        let mut index = Self::default();
        for (position, record) in records.into_iter().enumerate() {
            index.insert_or_skip(position, record.into_schema());
        }
        index
    }

    /// Read a `tables.json` file and build the index from it.
    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(Self::build(read_schema_values(path)?))
    }

    /// Schema for `db_id`, or `None` when the database is unknown.
    pub fn lookup(&self, db_id: &str) -> Option<&Schema> {
        self.schemas.get(db_id)
    }

    /// Lower-cased original table names of `db_id`; empty when unknown.
    pub fn table_names(&self, db_id: &str) -> &HashSet<String> {
        self.table_names.get(db_id).unwrap_or(&self.empty)
    }

    /// Case-insensitive table membership for `db_id`.
    pub fn has_table(&self, db_id: &str, table: &str) -> bool {
        self.table_names(db_id).contains(&table.to_lowercase())
    }

    pub fn contains(&self, db_id: &str) -> bool {
        self.schemas.contains_key(db_id)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Entries dropped during construction, in input order.
    pub fn skipped(&self) -> &[SkippedRecord] {
        &self.skipped
    }

    /// Database ids in sorted order.
    pub fn db_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    fn insert_or_skip(&mut self, position: usize, parsed: Result<Schema>) {
        match parsed {
            Ok(schema) => self.insert(schema),
            Err(err) => {
                warn!(
                    event = "malformed_schema_record",
                    position = position,
                    error = %err,
                    "skipping schema record"
                );
                self.skipped.push(SkippedRecord {
                    position,
                    reason: err.to_string(),
                });
            }
        }
    }

    fn insert(&mut self, schema: Schema) {
        let names = schema
            .tables
            .iter()
            .map(|table| table.to_lowercase())
            .collect::<HashSet<_>>();

        if self.schemas.contains_key(&schema.id) {
            debug!(event = "duplicate_db_id", db_id = %schema.id, "replacing earlier schema");
        }

        self.table_names.insert(schema.id.clone(), names);
        self.schemas.insert(schema.id.clone(), schema);
    }
}
