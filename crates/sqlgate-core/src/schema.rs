use serde::{Deserialize, Serialize};

/// Table and column names of one benchmark database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub id: String,
    /// Original table names in declared order.
    pub tables: Vec<String>,
    /// Columns in declared order, including ownerless ones such as `*`.
    pub columns: Vec<Column>,
}

/// A column and the index of the table that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// `None` for columns attributed to no table (the wildcard).
    pub table: Option<usize>,
    pub name: String,
}

impl Schema {
    /// Columns owned by the table at `table_idx`, in declared order.
    pub fn columns_of(&self, table_idx: usize) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(move |column| column.table == Some(table_idx))
    }
}
