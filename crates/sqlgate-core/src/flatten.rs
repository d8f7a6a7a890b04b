use crate::schema::Schema;

/// Render a schema as the single-line context string fed to the model.
///
/// Tables keep their declared order; ownerless columns and `*` are left out.
/// Example: `Tables: users(id, name), orders(id, user_id, total)`.
pub fn flatten_schema(schema: &Schema) -> String {
    let parts = schema
        .tables
        .iter()
        .enumerate()
        .map(|(idx, table)| {
            let columns = schema
                .columns_of(idx)
                .filter(|column| column.name != "*")
                .map(|column| column.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("{table}({columns})")
        })
        .collect::<Vec<_>>();

    format!("Tables: {}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SchemaRecord;

    fn record(tables: &[&str], columns: &[(i64, &str)]) -> SchemaRecord {
        SchemaRecord {
            db_id: "test_db".to_string(),
            table_names_original: tables.iter().map(|t| t.to_string()).collect(),
            column_names_original: columns
                .iter()
                .map(|(owner, name)| (*owner, name.to_string()))
                .collect(),
        }
    }

    #[test]
    fn flattens_users_and_orders() {
        let schema = record(
            &["users", "orders"],
            &[
                (-1, "*"),
                (0, "id"),
                (0, "name"),
                (1, "id"),
                (1, "user_id"),
                (1, "total"),
            ],
        )
        .into_schema()
        .unwrap();

        assert_eq!(
            flatten_schema(&schema),
            "Tables: users(id, name), orders(id, user_id, total)"
        );
    }

    #[test]
    fn table_without_columns_renders_empty_parens() {
        let schema = record(&["empty", "t"], &[(1, "a")]).into_schema().unwrap();

        assert_eq!(flatten_schema(&schema), "Tables: empty(), t(a)");
    }

    #[test]
    fn interleaved_columns_group_by_owner() {
        let schema = record(&["a", "b"], &[(1, "x"), (0, "y"), (1, "z")])
            .into_schema()
            .unwrap();

        assert_eq!(flatten_schema(&schema), "Tables: a(y), b(x, z)");
    }
}
