use schemars::schema_for;
use sqlgate_core::SchemaRecord;

#[test]
fn json_schema_lists_required_record_fields() {
    let generated = schema_for!(SchemaRecord);
    let json = serde_json::to_value(&generated).expect("serialize generated schema");

    let required = json["required"]
        .as_array()
        .expect("required fields")
        .iter()
        .filter_map(|value| value.as_str())
        .collect::<Vec<_>>();

    for field in ["db_id", "table_names_original", "column_names_original"] {
        assert!(required.contains(&field), "missing required field {field}");
    }
}
