use thiserror::Error;

use crate::types::DataType;

/// Convenience result type used across the crate.
pub type DataToolsResult<T> = Result<T, DataToolsError>;

/// Error type returned by coercion, arithmetic, aggregation and ingestion functions.
///
/// This is a single error enum shared by every module. Null handling is never an error: it is
/// controlled by `skip_nulls` and by the choice between `get_as` and `try_get_as`.
#[derive(Debug, Error)]
pub enum DataToolsError {
    /// A non-null cell has no defined conversion to the requested type, or its text is malformed.
    #[error("cannot coerce {from} to {to}: {message}")]
    Coercion {
        from: String,
        to: DataType,
        message: String,
    },

    /// The requested field does not exist on the record source.
    #[error("field not found: '{field}'")]
    FieldNotFound { field: String },

    /// Integer, decimal or time-span division by zero.
    #[error("division by zero")]
    DivideByZero,

    /// The reducer is not defined for the field's type (e.g. Average over DateTime).
    #[error("{op} is not supported for type {data_type}")]
    UnsupportedReducerType { op: String, data_type: DataType },

    /// Checked integer/temporal arithmetic left the representable range.
    #[error("arithmetic overflow in {op}")]
    ArithmeticOverflow { op: &'static str },

    /// The operands are not valid for the operation (e.g. adding a Guid, dividing by null).
    #[error("invalid operands for {op}: {message}")]
    InvalidOperation { op: &'static str, message: String },

    /// `min_value`/`max_value` was read from a [`crate::processing::MinMax`] without a value.
    #[error("min/max pair has no value")]
    EmptyMinMax,

    /// An array's declared shape does not match the number of items supplied.
    #[error("shape mismatch: {message}")]
    ShapeMismatch { message: String },

    /// Engine or ingestion options are out of range (e.g. a zero chunk size).
    #[error("invalid options: {message}")]
    InvalidOptions { message: String },

    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV ingestion error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON ingestion error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error raised while reading a Polars `DataFrame` source.
    #[error("polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// The input does not conform to the provided schema (missing required fields/columns, etc.).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the required [`DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },
}

impl DataToolsError {
    pub(crate) fn coercion(from: impl Into<String>, to: DataType, message: impl Into<String>) -> Self {
        Self::Coercion {
            from: from.into(),
            to,
            message: message.into(),
        }
    }

    pub(crate) fn field_not_found(field: impl Into<String>) -> Self {
        Self::FieldNotFound {
            field: field.into(),
        }
    }

    pub(crate) fn unsupported(op: impl ToString, data_type: DataType) -> Self {
        Self::UnsupportedReducerType {
            op: op.to_string(),
            data_type,
        }
    }
}
