//! Per-column coercion accounting for loaded tables.
//!
//! Every raw cell is parsed into its field's canonical type. Under [`CellPolicy::Strict`] the
//! first cell that does not parse aborts the load with [`DataToolsError::ParseError`]; under
//! [`CellPolicy::NullOnFailure`] the cell is stored as null (or the empty value in a
//! non-nullable column) and recorded as a [`CellRejection`].

use std::fmt;

use crate::error::{DataToolsError, DataToolsResult};
use crate::processing::coerce::parse_as;
use crate::types::{DataSet, DataType, Field, Schema, Value};

/// What to do with a cell that cannot be coerced to its field's type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CellPolicy {
    /// Fail the whole load.
    #[default]
    Strict,
    /// Store null (or the column's empty value) and keep going.
    NullOnFailure,
}

/// A cell that could not be coerced to its field's type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRejection {
    /// 1-based row in the source (the CSV header is row 1).
    pub row: usize,
    pub column: String,
    pub data_type: DataType,
    /// Source text of the cell.
    pub raw: String,
    pub message: String,
}

impl fmt::Display for CellRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {} column '{}': {:?} is not a valid {} ({})",
            self.row, self.column, self.raw, self.data_type, self.message
        )
    }
}

impl From<CellRejection> for DataToolsError {
    fn from(r: CellRejection) -> Self {
        DataToolsError::ParseError {
            row: r.row,
            column: r.column,
            raw: r.raw,
            message: r.message,
        }
    }
}

/// Cell counts for one schema column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnReport {
    pub name: String,
    pub data_type: DataType,
    /// Cells stored as null, including rejected cells in nullable columns.
    pub nulls: usize,
    /// Cells that could not be coerced.
    pub rejected: usize,
}

/// Outcome of loading one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionReport {
    pub rows: usize,
    /// One entry per schema field, in schema order.
    pub columns: Vec<ColumnReport>,
    /// Every rejected cell, in source order. Always empty under [`CellPolicy::Strict`].
    pub rejections: Vec<CellRejection>,
}

impl IngestionReport {
    pub fn null_cells(&self) -> usize {
        self.columns.iter().map(|c| c.nulls).sum()
    }

    pub fn rejected_cells(&self) -> usize {
        self.rejections.len()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnReport> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A loaded table together with its report.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    pub dataset: DataSet,
    pub report: IngestionReport,
}

/// Row-by-row table assembly shared by the format readers.
pub(crate) struct TableBuilder<'s> {
    schema: &'s Schema,
    policy: CellPolicy,
    rows: Vec<Vec<Value>>,
    current: Vec<Value>,
    columns: Vec<ColumnReport>,
    rejections: Vec<CellRejection>,
}

impl<'s> TableBuilder<'s> {
    pub(crate) fn new(schema: &'s Schema, policy: CellPolicy) -> Self {
        let columns = schema
            .fields
            .iter()
            .map(|f| ColumnReport {
                name: f.name.clone(),
                data_type: f.data_type,
                nulls: 0,
                rejected: 0,
            })
            .collect();
        Self {
            schema,
            policy,
            rows: Vec::new(),
            current: Vec::with_capacity(schema.fields.len()),
            columns,
            rejections: Vec::new(),
        }
    }

    /// Parse raw text into the next cell of the current row.
    pub(crate) fn push_text(&mut self, row: usize, raw: &str) -> DataToolsResult<()> {
        let data_type = self.next_field()?.data_type;
        let parsed = parse_as(raw, data_type);
        self.push_parsed(row, raw, parsed)
    }

    /// Store an already-converted cell, or account for its conversion failure.
    pub(crate) fn push_parsed(&mut self, row: usize, raw: &str, parsed: DataToolsResult<Value>) -> DataToolsResult<()> {
        let idx = self.current.len();
        let field = self.next_field()?;
        let cell = match parsed {
            Ok(cell) => cell,
            Err(cause) => {
                let rejection = CellRejection {
                    row,
                    column: field.name.clone(),
                    data_type: field.data_type,
                    raw: raw.to_owned(),
                    message: match cause {
                        DataToolsError::Coercion { message, .. } => message,
                        other => other.to_string(),
                    },
                };
                if self.policy == CellPolicy::Strict {
                    return Err(rejection.into());
                }
                self.columns[idx].rejected += 1;
                self.rejections.push(rejection);
                Value::Null
            }
        };
        let cell = non_null_slot(field, cell);
        if cell.is_null() {
            self.columns[idx].nulls += 1;
        }
        self.current.push(cell);
        Ok(())
    }

    pub(crate) fn end_row(&mut self) {
        let width = self.schema.fields.len();
        self.rows.push(std::mem::replace(&mut self.current, Vec::with_capacity(width)));
    }

    pub(crate) fn finish(self) -> Ingested {
        Ingested {
            report: IngestionReport {
                rows: self.rows.len(),
                columns: self.columns,
                rejections: self.rejections,
            },
            dataset: DataSet::new(self.schema.clone(), self.rows),
        }
    }

    fn next_field(&self) -> DataToolsResult<&'s Field> {
        self.schema
            .fields
            .get(self.current.len())
            .ok_or_else(|| DataToolsError::SchemaMismatch {
                message: format!("row has more cells than the schema's {} fields", self.schema.fields.len()),
            })
    }
}

/// Non-nullable columns store the empty value in place of null.
fn non_null_slot(field: &Field, cell: Value) -> Value {
    if cell.is_null() && !field.nullable {
        field.data_type.empty_value()
    } else {
        cell
    }
}
