//! Core data model: dynamically-typed cells, canonical types and an in-memory tabular container.
//!
//! A [`Value`] is a single cell. Its run-time [`DataType`] tag is what coercion and the
//! type-erased reducers switch on. [`DataSet`] is a schema-described, row-major table that
//! implements the record-source traits in [`crate::source`].

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DataToolsError, DataToolsResult};

/// Canonical (logical) type of a cell or schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit floating point number.
    Float32,
    /// 64-bit floating point number.
    Float64,
    /// 96-bit high-precision decimal.
    Decimal,
    /// Boolean.
    Bool,
    /// Date and time without offset.
    DateTime,
    /// Signed elapsed time.
    TimeSpan,
    /// 128-bit unique identifier.
    Guid,
    /// UTF-8 string.
    Utf8,
    /// Raw byte sequence.
    Binary,
    /// Opaque payload with no canonical conversions.
    Object,
}

impl DataType {
    /// The single "empty" representation of this type, as a cell.
    ///
    /// [`DataType::Object`] has no empty value and yields [`Value::Null`].
    pub fn empty_value(&self) -> Value {
        match self {
            DataType::Int32 => Value::Int32(0),
            DataType::Int64 => Value::Int64(0),
            DataType::Float32 => Value::Float32(0.0),
            DataType::Float64 => Value::Float64(0.0),
            DataType::Decimal => Value::Decimal(Decimal::ZERO),
            DataType::Bool => Value::Bool(false),
            DataType::DateTime => Value::DateTime(datetime_min()),
            DataType::TimeSpan => Value::TimeSpan(TimeDelta::zero()),
            DataType::Guid => Value::Guid(Uuid::nil()),
            DataType::Utf8 => Value::Utf8(String::new()),
            DataType::Binary => Value::Binary(Vec::new()),
            DataType::Object => Value::Null,
        }
    }

    /// Whether this type takes part in numeric promotion.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Int32 | DataType::Int64 | DataType::Float32 | DataType::Float64 | DataType::Decimal
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The minimum representable date-time, `0001-01-01T00:00:00`, used as the empty DateTime.
pub fn datetime_min() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .unwrap_or_default()
        .and_time(NaiveTime::default())
}

/// A reference-counted payload carried by [`Value::Object`].
///
/// Two opaque values are equal only if they share the same allocation.
#[derive(Clone)]
pub struct OpaqueValue {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl OpaqueValue {
    /// Wrap any `'static` payload.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    /// Name of the wrapped Rust type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the payload if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Allocation address, stable for the lifetime of the payload.
    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaqueValue")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for OpaqueValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// A single dynamically-typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 32-bit float.
    Float32(f32),
    /// 64-bit float.
    Float64(f64),
    /// High-precision decimal.
    Decimal(Decimal),
    /// Date and time.
    DateTime(NaiveDateTime),
    /// Elapsed time.
    TimeSpan(TimeDelta),
    /// Unique identifier.
    Guid(Uuid),
    /// UTF-8 string.
    Utf8(String),
    /// Raw bytes.
    Binary(Vec<u8>),
    /// Opaque object.
    Object(OpaqueValue),
}

impl Value {
    /// Run-time type of this cell, or `None` for [`Value::Null`].
    pub fn data_type(&self) -> Option<DataType> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => DataType::Bool,
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::Float32(_) => DataType::Float32,
            Value::Float64(_) => DataType::Float64,
            Value::Decimal(_) => DataType::Decimal,
            Value::DateTime(_) => DataType::DateTime,
            Value::TimeSpan(_) => DataType::TimeSpan,
            Value::Guid(_) => DataType::Guid,
            Value::Utf8(_) => DataType::Utf8,
            Value::Binary(_) => DataType::Binary,
            Value::Object(_) => DataType::Object,
        })
    }

    /// Short type label used in error messages.
    pub fn type_label(&self) -> String {
        match self {
            Value::Null => "Null".to_string(),
            Value::Object(o) => format!("Object({})", o.type_name()),
            other => other
                .data_type()
                .map(|t| t.to_string())
                .unwrap_or_default(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `true` for null, the empty string and a zero-length byte sequence.
    pub fn is_empty_value(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Utf8(s) => s.is_empty(),
            Value::Binary(b) => b.is_empty(),
            _ => false,
        }
    }
}

/// Cells of the same variant compare by value; cells of different variants are unordered.
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::Int32(a), Value::Int32(b)) => a.partial_cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.partial_cmp(b),
            (Value::Float32(a), Value::Float32(b)) => a.partial_cmp(b),
            (Value::Float64(a), Value::Float64(b)) => a.partial_cmp(b),
            (Value::Decimal(a), Value::Decimal(b)) => a.partial_cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.partial_cmp(b),
            (Value::TimeSpan(a), Value::TimeSpan(b)) => a.partial_cmp(b),
            (Value::Guid(a), Value::Guid(b)) => a.partial_cmp(b),
            (Value::Utf8(a), Value::Utf8(b)) => a.partial_cmp(b),
            (Value::Binary(a), Value::Binary(b)) => a.partial_cmp(b),
            (Value::Object(a), Value::Object(b)) if a == b => Some(Ordering::Equal),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    Decimal => Decimal,
    NaiveDateTime => DateTime,
    TimeDelta => TimeSpan,
    Uuid => Guid,
    String => Utf8,
    Vec<u8> => Binary,
    OpaqueValue => Object,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
    /// Whether writing the type's empty value stores a null.
    ///
    /// Non-nullable ("NN") slots store the empty value itself and never report null.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl Field {
    /// Create a new nullable field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    /// Create a non-nullable field.
    pub fn not_null(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
        }
    }
}

/// A list of fields describing the expected shape of incoming data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Returns a field by name, if present.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub(crate) fn require(&self, name: &str) -> DataToolsResult<usize> {
        self.index_of(name)
            .ok_or_else(|| DataToolsError::field_not_found(name))
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Create an empty dataset.
    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Borrow a row as a record.
    pub fn row(&self, idx: usize) -> Option<RowRef<'_>> {
        self.rows.get(idx).map(|values| RowRef {
            schema: &self.schema,
            values,
        })
    }

    /// Create a detached all-null row with this dataset's schema.
    pub fn new_row(&self) -> DataRow {
        DataRow::new(self.schema.clone())
    }

    /// Append a row built with [`DataSet::new_row`].
    pub fn push_row(&mut self, row: DataRow) -> DataToolsResult<()> {
        if row.schema != self.schema {
            return Err(DataToolsError::SchemaMismatch {
                message: "row schema does not match dataset schema".to_string(),
            });
        }
        self.rows.push(row.values);
        Ok(())
    }

    /// Iterate the cells of one column.
    pub fn column(&self, name: &str) -> DataToolsResult<impl Iterator<Item = &Value>> {
        let idx = self.schema.require(name)?;
        Ok(self.rows.iter().map(move |row| row.get(idx).unwrap_or(&Value::Null)))
    }
}

/// A borrowed row of a [`DataSet`].
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    pub schema: &'a Schema,
    pub values: &'a [Value],
}

/// An owned row that carries its own schema.
///
/// Typically used as a "totals" row: reducers return new values and the caller stores them back
/// with [`DataRow::set`] or [`DataRow::set_as`].
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    pub(crate) schema: Schema,
    pub(crate) values: Vec<Value>,
}

impl DataRow {
    /// Create an all-null row.
    pub fn new(schema: Schema) -> Self {
        let values = vec![Value::Null; schema.fields.len()];
        Self { schema, values }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Store a raw cell.
    pub fn set(&mut self, name: &str, value: Value) -> DataToolsResult<()> {
        let idx = self.schema.require(name)?;
        self.values[idx] = value;
        Ok(())
    }

    /// Nullability of a field, used to pick the null/non-null write policy.
    pub(crate) fn is_nullable(&self, name: &str) -> DataToolsResult<bool> {
        self.schema
            .field(name)
            .map(|f| f.nullable)
            .ok_or_else(|| DataToolsError::field_not_found(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("active", DataType::Bool),
            Field::new("name", DataType::Utf8),
        ]);

        let rows = vec![
            vec![Value::Int64(1), Value::Bool(true), Value::Utf8("a".to_string())],
            vec![Value::Int64(2), Value::Bool(false), Value::Null],
        ];

        DataSet::new(schema, rows)
    }

    #[test]
    fn schema_index_of_works() {
        let ds = sample_dataset();
        assert_eq!(ds.schema.index_of("id"), Some(0));
        assert_eq!(ds.schema.index_of("name"), Some(2));
        assert_eq!(ds.schema.index_of("missing"), None);
    }

    #[test]
    fn empty_values_cover_every_type() {
        assert_eq!(DataType::Int32.empty_value(), Value::Int32(0));
        assert_eq!(DataType::Utf8.empty_value(), Value::Utf8(String::new()));
        assert_eq!(DataType::Guid.empty_value(), Value::Guid(Uuid::nil()));
        assert_eq!(DataType::TimeSpan.empty_value(), Value::TimeSpan(TimeDelta::zero()));
        assert_eq!(
            DataType::DateTime.empty_value(),
            Value::DateTime(NaiveDate::from_ymd_opt(1, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())
        );
        assert_eq!(DataType::Object.empty_value(), Value::Null);
    }

    #[test]
    fn is_empty_value_treats_null_blank_and_no_bytes_alike() {
        assert!(Value::Null.is_empty_value());
        assert!(Value::Utf8(String::new()).is_empty_value());
        assert!(Value::Binary(Vec::new()).is_empty_value());
        assert!(!Value::Int32(0).is_empty_value());
        assert!(!Value::Utf8(" ".to_string()).is_empty_value());
    }

    #[test]
    fn values_of_different_variants_are_unordered() {
        assert!(Value::Int32(1) < Value::Int32(2));
        assert_eq!(Value::Int32(1).partial_cmp(&Value::Int64(1)), None);
        assert_eq!(Value::Null.partial_cmp(&Value::Int32(0)), None);
    }

    #[test]
    fn opaque_values_compare_by_identity() {
        let a = OpaqueValue::new(vec![1u8, 2]);
        let b = OpaqueValue::new(vec![1u8, 2]);
        assert_eq!(Value::Object(a.clone()), Value::Object(a.clone()));
        assert_ne!(Value::Object(a.clone()), Value::Object(b));
        assert_eq!(a.downcast_ref::<Vec<u8>>(), Some(&vec![1u8, 2]));
    }

    #[test]
    fn push_row_rejects_foreign_schema() {
        let mut ds = sample_dataset();
        let mut row = ds.new_row();
        row.set("id", Value::Int64(3)).unwrap();
        ds.push_row(row).unwrap();
        assert_eq!(ds.row_count(), 3);
        assert_eq!(ds.rows[2], vec![Value::Int64(3), Value::Null, Value::Null]);

        let foreign = DataRow::new(Schema::new(vec![Field::new("x", DataType::Int32)]));
        assert!(ds.push_row(foreign).is_err());
    }

    #[test]
    fn column_reports_missing_field() {
        let ds = sample_dataset();
        let names: Vec<&Value> = ds.column("name").unwrap().collect();
        assert_eq!(names, vec![&Value::Utf8("a".to_string()), &Value::Null]);
        assert!(matches!(
            ds.column("nope").err(),
            Some(DataToolsError::FieldNotFound { .. })
        ));
    }
}
