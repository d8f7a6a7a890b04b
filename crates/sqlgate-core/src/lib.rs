//! Core schema contracts for sqlgate.
//!
//! This crate turns raw `tables.json` records into an immutable
//! [`SchemaIndex`] and renders schemas into the flattened text form the
//! generation model is conditioned on.

pub mod error;
pub mod flatten;
pub mod index;
pub mod record;
pub mod schema;

pub use error::{Error, Result};
pub use flatten::flatten_schema;
pub use index::{SchemaIndex, SkippedRecord};
pub use record::{SchemaRecord, load_schema_records, read_schema_values};
pub use schema::{Column, Schema};

/// Column owner index used by raw records for columns that belong to no table.
pub const NO_TABLE: i64 = -1;
