//! CSV loading.
//!
//! The file must have a header row. Schema fields are matched to headers by name, so column order
//! is free and extra columns are ignored. Blank cells are null.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::error::{DataToolsError, DataToolsResult};
use crate::types::{DataSet, Schema};

use super::report::{CellPolicy, Ingested, TableBuilder};

/// Load a CSV file, failing on the first cell that does not coerce.
pub fn ingest_csv_from_path(path: impl AsRef<Path>, schema: &Schema) -> DataToolsResult<DataSet> {
    Ok(ingest_csv_with_policy(path, schema, CellPolicy::Strict)?.dataset)
}

/// Load CSV text held in memory.
pub fn ingest_csv_from_str(input: &str, schema: &Schema) -> DataToolsResult<DataSet> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(input.as_bytes());
    ingest_csv_from_reader(&mut rdr, schema)
}

/// Load from an existing reader. The reader must be configured with `has_headers(true)`.
pub fn ingest_csv_from_reader<R: Read>(rdr: &mut csv::Reader<R>, schema: &Schema) -> DataToolsResult<DataSet> {
    Ok(load(rdr, schema, CellPolicy::Strict)?.dataset)
}

/// Load a CSV file under `policy`, reporting per-column null and rejection counts.
pub fn ingest_csv_with_policy(
    path: impl AsRef<Path>,
    schema: &Schema,
    policy: CellPolicy,
) -> DataToolsResult<Ingested> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    load(&mut rdr, schema, policy)
}

pub(crate) fn load<R: Read>(rdr: &mut csv::Reader<R>, schema: &Schema, policy: CellPolicy) -> DataToolsResult<Ingested> {
    let positions = header_positions(rdr.headers()?, schema)?;
    let mut table = TableBuilder::new(schema, policy);
    let mut record = StringRecord::new();
    // The header is row 1.
    let mut row = 1;
    while rdr.read_record(&mut record)? {
        row = record.position().map_or(row + 1, |p| p.line() as usize);
        for &pos in &positions {
            table.push_text(row, record.get(pos).unwrap_or(""))?;
        }
        table.end_row();
    }
    Ok(table.finish())
}

fn header_positions(headers: &StringRecord, schema: &Schema) -> DataToolsResult<Vec<usize>> {
    schema
        .fields
        .iter()
        .map(|field| {
            headers
                .iter()
                .position(|h| h.trim() == field.name)
                .ok_or_else(|| DataToolsError::SchemaMismatch {
                    message: format!(
                        "missing required column '{}'. headers={:?}",
                        field.name,
                        headers.iter().collect::<Vec<_>>()
                    ),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::load;
    use crate::ingestion::CellPolicy;
    use crate::types::{DataType, Field, Schema, Value};

    #[test]
    fn rejections_carry_the_source_row() {
        let schema = Schema::new(vec![Field::new("qty", DataType::Int32)]);
        let text = "qty,note\n1,a\nmany,b\n3,c\n";
        let mut rdr = csv::ReaderBuilder::new().from_reader(text.as_bytes());
        let out = load(&mut rdr, &schema, CellPolicy::NullOnFailure).unwrap();

        assert_eq!(out.dataset.rows, vec![vec![Value::Int32(1)], vec![Value::Null], vec![Value::Int32(3)]]);
        assert_eq!(out.report.rejections.len(), 1);
        assert_eq!(out.report.rejections[0].row, 3);
        assert_eq!(out.report.rejections[0].column, "qty");
    }
}
