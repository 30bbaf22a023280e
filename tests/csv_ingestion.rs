use std::str::FromStr;

use chrono::TimeDelta;
use rust_decimal::Decimal;

use rust_data_tools::ingestion::csv::{ingest_csv_from_path, ingest_csv_from_reader, ingest_csv_from_str};
use rust_data_tools::types::{DataType, Field, Schema, Value};
use rust_data_tools::DataToolsError;

fn people_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Int64),
        Field::new("name", DataType::Utf8),
        Field::new("score", DataType::Float64),
        Field::new("active", DataType::Bool),
    ])
}

#[test]
fn ingest_csv_from_path_happy_path() {
    let schema = people_schema();
    let ds = ingest_csv_from_path("tests/fixtures/people.csv", &schema).unwrap();

    assert_eq!(ds.row_count(), 2);
    assert_eq!(
        ds.rows[0],
        vec![
            Value::Int64(1),
            Value::Utf8("Ada".to_string()),
            Value::Float64(98.5),
            Value::Bool(true),
        ]
    );
}

#[test]
fn ingest_csv_allows_reordered_columns() {
    let schema = people_schema();
    let input = "name,id,active,score\nAda,1,true,98.5\n";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    let ds = ingest_csv_from_reader(&mut rdr, &schema).unwrap();
    assert_eq!(ds.row_count(), 1);
    assert_eq!(ds.rows[0][0], Value::Int64(1));
    assert_eq!(ds.rows[0][1], Value::Utf8("Ada".to_string()));
}

#[test]
fn ingest_csv_errors_on_missing_required_column() {
    let schema = people_schema();
    let err = ingest_csv_from_str("id,name,score\n1,Ada,98.5\n", &schema).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("schema mismatch"));
    assert!(msg.contains("missing required column 'active'"));
}

#[test]
fn ingest_csv_errors_on_type_parse() {
    let schema = people_schema();
    let err = ingest_csv_from_str("id,name,score,active\n1,Ada,98.5,true\nnot_an_int,Bob,1,false\n", &schema)
        .unwrap_err();
    match err {
        DataToolsError::ParseError { row, column, raw, .. } => {
            assert_eq!(row, 3);
            assert_eq!(column, "id");
            assert_eq!(raw, "not_an_int");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn ingest_csv_parses_canonical_text_for_every_type() {
    let schema = Schema::new(vec![
        Field::new("amount", DataType::Decimal),
        Field::new("when", DataType::DateTime),
        Field::new("took", DataType::TimeSpan),
        Field::new("small", DataType::Int32),
        Field::new("ratio", DataType::Float32),
    ]);
    let ds = ingest_csv_from_str(
        "amount,when,took,small,ratio\n 12.50 ,2024-03-01 08:00:00,1.02:03:04.5, -7 ,0.25\n",
        &schema,
    )
    .unwrap();

    let row = &ds.rows[0];
    assert_eq!(row[0], Value::Decimal(Decimal::from_str("12.50").unwrap()));
    assert_eq!(row[1].data_type(), Some(DataType::DateTime));
    assert_eq!(
        row[2],
        Value::TimeSpan(
            TimeDelta::days(1) + TimeDelta::hours(2) + TimeDelta::minutes(3) + TimeDelta::milliseconds(4_500)
        )
    );
    assert_eq!(row[3], Value::Int32(-7));
    assert_eq!(row[4], Value::Float32(0.25));
}

#[test]
fn blank_cells_are_null_unless_the_column_is_non_nullable() {
    let schema = Schema::new(vec![
        Field::new("maybe", DataType::Int64),
        Field::not_null("always", DataType::Int64),
        Field::new("label", DataType::Utf8),
    ]);
    let ds = ingest_csv_from_str("maybe,always,label\n,,  \n", &schema).unwrap();
    assert_eq!(ds.rows[0], vec![Value::Null, Value::Int64(0), Value::Null]);
}
