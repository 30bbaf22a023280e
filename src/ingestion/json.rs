//! JSON and NDJSON loading.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - A single JSON object
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Nested fields are supported using dot paths in schema field names (e.g. `user.name`).
//!
//! Strings are parsed with the canonical text rules, so `"12.50"` loads into a `Decimal` field and
//! `"2024-03-01T08:00:00"` into a `DateTime` field. Numbers are converted by their JSON text,
//! which keeps decimals exact.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value as JsonValue};

use crate::error::{DataToolsError, DataToolsResult};
use crate::processing::coerce::{coerce_to, parse_as};
use crate::types::{DataSet, DataType, Schema, Value};

use super::report::{CellPolicy, Ingested, TableBuilder};

/// Load a JSON or NDJSON file, failing on the first cell that does not coerce.
pub fn ingest_json_from_path(path: impl AsRef<Path>, schema: &Schema) -> DataToolsResult<DataSet> {
    Ok(ingest_json_with_policy(path, schema, CellPolicy::Strict)?.dataset)
}

/// Load JSON text held in memory.
pub fn ingest_json_from_str(input: &str, schema: &Schema) -> DataToolsResult<DataSet> {
    Ok(load(input, schema, CellPolicy::Strict)?.dataset)
}

/// Load a JSON or NDJSON file under `policy`, reporting per-column null and rejection counts.
pub fn ingest_json_with_policy(
    path: impl AsRef<Path>,
    schema: &Schema,
    policy: CellPolicy,
) -> DataToolsResult<Ingested> {
    let text = fs::read_to_string(path)?;
    load(&text, schema, policy)
}

pub(crate) fn load(input: &str, schema: &Schema, policy: CellPolicy) -> DataToolsResult<Ingested> {
    let mut table = TableBuilder::new(schema, policy);
    for (row, object) in objects(input)?.iter().enumerate() {
        let row = row + 1;
        let object = object.as_object().ok_or_else(|| DataToolsError::SchemaMismatch {
            message: format!("row {row} is not a json object"),
        })?;
        for field in &schema.fields {
            let jv = get_by_dot_path(object, &field.name).ok_or_else(|| DataToolsError::SchemaMismatch {
                message: format!("row {row} missing required field '{}'", field.name),
            })?;
            let raw = match jv {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            };
            table.push_parsed(row, &raw, convert_json_value(field.data_type, jv))?;
        }
        table.end_row();
    }
    Ok(table.finish())
}

/// A single array or object first, NDJSON otherwise.
fn objects(input: &str) -> DataToolsResult<Vec<JsonValue>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DataToolsError::SchemaMismatch {
            message: "json input is empty".to_string(),
        });
    }
    match serde_json::from_str::<JsonValue>(trimmed) {
        Ok(JsonValue::Array(items)) => Ok(items),
        Ok(v @ JsonValue::Object(_)) => Ok(vec![v]),
        Ok(_) => Err(DataToolsError::SchemaMismatch {
            message: "json must be an object, an array of objects, or NDJSON".to_string(),
        }),
        Err(_) => trimmed
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line.trim()).map_err(|e| DataToolsError::SchemaMismatch {
                    message: format!("invalid ndjson at line {}: {e}", i + 1),
                })
            })
            .collect(),
    }
}

fn get_by_dot_path<'a>(root: &'a Map<String, JsonValue>, path: &str) -> Option<&'a JsonValue> {
    // A literal key wins over a nested path.
    if let Some(v) = root.get(path) {
        return Some(v);
    }
    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn convert_json_value(data_type: DataType, v: &JsonValue) -> DataToolsResult<Value> {
    match v {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::String(s) => parse_as(s, data_type),
        JsonValue::Bool(b) => coerce_to(&Value::Bool(*b), data_type),
        // Integral numbers convert numerically, so 0/1 load into Bool fields.
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => coerce_to(&Value::Int64(i), data_type),
            None => parse_as(&n.to_string(), data_type),
        },
        JsonValue::Array(_) | JsonValue::Object(_) if data_type == DataType::Utf8 => Ok(Value::Utf8(v.to_string())),
        JsonValue::Array(_) | JsonValue::Object(_) => Err(DataToolsError::coercion(
            "nested json",
            data_type,
            format!("expected a scalar for {data_type}"),
        )),
    }
}
