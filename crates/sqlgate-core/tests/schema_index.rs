use std::path::Path;

use sqlgate_core::{SchemaIndex, flatten_schema, load_schema_records};

fn fixture() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/tables.json")
}

#[test]
fn builds_index_from_tables_json_and_skips_malformed_entry() {
    let index = SchemaIndex::from_path(&fixture()).expect("read tables.json");

    assert_eq!(index.db_ids(), vec!["school", "test_db"]);
    assert_eq!(index.skipped().len(), 1);
    assert_eq!(index.skipped()[0].position, 2);
    assert!(index.has_table("school", "Enrollment"));
}

#[test]
fn flattened_fixture_matches_model_input_format() {
    let index = SchemaIndex::from_path(&fixture()).expect("read tables.json");
    let schema = index.lookup("test_db").expect("test_db present");

    assert_eq!(
        flatten_schema(schema),
        "Tables: users(id, name), orders(id, user_id, total)"
    );
}

#[test]
fn strict_loader_fails_on_malformed_entry() {
    assert!(load_schema_records(&fixture()).is_err());
}
