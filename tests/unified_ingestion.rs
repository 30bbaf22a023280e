use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use rust_data_tools::ingestion::{ingest_from_path, ingest_with_report, CellPolicy, IngestionFormat, IngestionOptions};
use rust_data_tools::types::{DataType, Field, Schema, Value};
use rust_data_tools::DataToolsError;

fn tmp_file(ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("rust-data-tools-unified-{nanos}.{ext}"))
}

fn people_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Int64),
        Field::new("name", DataType::Utf8),
        Field::new("score", DataType::Float64),
        Field::new("active", DataType::Bool),
    ])
}

fn people_schema_json_nested() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Int64),
        Field::new("user.name", DataType::Utf8),
        Field::new("score", DataType::Float64),
        Field::new("active", DataType::Bool),
    ])
}

#[test]
fn unified_ingest_csv_auto_by_extension() {
    let schema = people_schema();
    let opts = IngestionOptions::default();
    let ds = ingest_from_path("tests/fixtures/people.csv", &schema, &opts).unwrap();
    assert_eq!(ds.row_count(), 2);
    assert_eq!(ds.rows[0][0], Value::Int64(1));
}

#[test]
fn unified_ingest_csv_explicit_format() {
    let schema = people_schema();
    let opts = IngestionOptions {
        format: Some(IngestionFormat::Csv),
        ..Default::default()
    };
    let ds = ingest_from_path("tests/fixtures/people.csv", &schema, &opts).unwrap();
    assert_eq!(ds.row_count(), 2);
}

#[test]
fn unified_ingest_json_explicit_format_errors_with_flat_schema() {
    let schema = people_schema();
    let opts = IngestionOptions {
        format: Some(IngestionFormat::Json),
        ..Default::default()
    };
    // The fixture nests the name under "user".
    let err = ingest_from_path("tests/fixtures/people.json", &schema, &opts).unwrap_err();
    assert!(err.to_string().contains("missing required field 'name'"));
}

#[test]
fn unified_ingest_json_auto_by_extension_happy_path_nested_schema() {
    let schema = people_schema_json_nested();
    let opts = IngestionOptions::default();
    let ds = ingest_from_path("tests/fixtures/people.json", &schema, &opts).unwrap();
    assert_eq!(ds.row_count(), 2);
    assert_eq!(ds.rows[0][1], Value::Utf8("Ada".to_string()));
}

#[test]
fn unified_ingest_ndjson_auto_by_extension() {
    let schema = Schema::new(vec![Field::new("region", DataType::Utf8)]);
    let ds = ingest_from_path("tests/fixtures/sales.ndjson", &schema, &IngestionOptions::default()).unwrap();
    assert_eq!(ds.row_count(), 6);
}

#[test]
fn explicit_format_overrides_a_missing_extension() {
    let path = tmp_file("data");
    std::fs::write(&path, "id,name,score,active\n7,Linus,1.5,false\n").unwrap();

    let err = ingest_from_path(&path, &people_schema(), &IngestionOptions::default()).unwrap_err();
    assert!(matches!(err, DataToolsError::SchemaMismatch { .. }));

    let opts = IngestionOptions {
        format: Some(IngestionFormat::Csv),
        ..Default::default()
    };
    let ds = ingest_from_path(&path, &people_schema(), &opts).unwrap();
    assert_eq!(ds.rows[0][1], Value::from("Linus"));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn unified_ingest_switch_formats_same_schema() {
    let schema = people_schema_json_nested();
    let path = tmp_file("csv");
    std::fs::write(&path, "id,user.name,score,active\n1,Ada,98.5,true\n2,Grace,87.25,false\n").unwrap();

    let ds_csv = ingest_from_path(&path, &schema, &IngestionOptions::default()).unwrap();
    let ds_json = ingest_from_path("tests/fixtures/people.json", &schema, &IngestionOptions::default()).unwrap();
    assert_eq!(ds_csv, ds_json);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn lenient_policy_loads_what_strict_rejects() {
    let schema = Schema::new(vec![
        Field::new("region", DataType::Utf8),
        Field::new("qty", DataType::Int32),
        Field::not_null("amount", DataType::Decimal),
    ]);
    let path = tmp_file("csv");
    std::fs::write(&path, "region,qty,amount\nnorth,3,1.50\nsouth,lots,n/a\neast,,2\n").unwrap();

    let err = ingest_from_path(&path, &schema, &IngestionOptions::default()).unwrap_err();
    assert!(matches!(err, DataToolsError::ParseError { row: 3, ref column, .. } if column == "qty"));

    let opts = IngestionOptions {
        policy: CellPolicy::NullOnFailure,
        ..Default::default()
    };
    let loaded = ingest_with_report(&path, &schema, &opts).unwrap();
    assert_eq!(loaded.dataset.row_count(), 3);
    assert_eq!(loaded.dataset.rows[1][1], Value::Null);
    assert_eq!(loaded.dataset.rows[1][2], Value::Decimal(rust_decimal::Decimal::ZERO));

    let qty = loaded.report.column("qty").unwrap();
    assert_eq!((qty.nulls, qty.rejected), (2, 1));
    let amount = loaded.report.column("amount").unwrap();
    assert_eq!((amount.nulls, amount.rejected), (0, 1));
    assert_eq!(loaded.report.column("region").unwrap().rejected, 0);

    let _ = std::fs::remove_file(&path);
}
