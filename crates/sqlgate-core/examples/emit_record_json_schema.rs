use schemars::schema_for;
use sqlgate_core::SchemaRecord;

fn main() {
    let schema = schema_for!(SchemaRecord);
    let json = serde_json::to_string_pretty(&schema).expect("serialize json schema");
    println!("{json}");
}
