//! Stable grouping of a record sequence by key fields.
//!
//! Groups appear in the order their key is first seen, and records keep their relative order
//! inside each group. This is a partition, not a sort.

use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::DataToolsResult;
use crate::source::{FieldSelector, RecordSequenceSource, RecordSource};
use crate::types::{DataType, Value};

/// Records of a source that share one key tuple.
pub struct RecordGroup<'s, S>
where
    S: RecordSequenceSource + ?Sized + 's,
{
    source: &'s S,
    key: Vec<Value>,
    records: Vec<S::Record<'s>>,
}

impl<'s, S> RecordGroup<'s, S>
where
    S: RecordSequenceSource + ?Sized + 's,
{
    /// Key cells, one per key field, as seen on the group's first record (after null
    /// normalisation).
    pub fn key(&self) -> &[Value] {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'s, S> fmt::Debug for RecordGroup<'s, S>
where
    S: RecordSequenceSource + ?Sized + 's,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordGroup")
            .field("key", &self.key)
            .field("len", &self.records.len())
            .finish()
    }
}

impl<'s, S> RecordSequenceSource for RecordGroup<'s, S>
where
    S: RecordSequenceSource + ?Sized + 's,
{
    type Record<'a>
        = &'a S::Record<'s>
    where
        Self: 'a;

    fn field_names(&self) -> Vec<&str> {
        self.source.field_names()
    }

    fn has_field(&self, name: &str) -> bool {
        self.source.has_field(name)
    }

    fn field_type(&self, name: &str) -> Option<DataType> {
        self.source.field_type(name)
    }

    fn records(&self) -> impl Iterator<Item = Self::Record<'_>> + '_ {
        self.records.iter()
    }
}

/// Hashable identity of one key cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Null,
    Bool(bool),
    Int(i64),
    FloatBits(u64),
    Decimal(Decimal),
    DateTime(NaiveDateTime),
    TimeSpan(TimeDelta),
    Guid(Uuid),
    Text(String),
    Bytes(Vec<u8>),
    Object(usize),
}

impl KeyPart {
    fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(v) => Self::Bool(*v),
            Value::Int32(v) => Self::Int(i64::from(*v)),
            Value::Int64(v) => Self::Int(*v),
            Value::Float32(v) => Self::float(f64::from(*v)),
            Value::Float64(v) => Self::float(*v),
            Value::Decimal(v) => Self::Decimal(v.normalize()),
            Value::DateTime(v) => Self::DateTime(*v),
            Value::TimeSpan(v) => Self::TimeSpan(*v),
            Value::Guid(v) => Self::Guid(*v),
            Value::Utf8(v) => Self::Text(v.clone()),
            Value::Binary(v) => Self::Bytes(v.clone()),
            Value::Object(v) => Self::Object(v.addr()),
        }
    }

    fn float(v: f64) -> Self {
        // One bit pattern for every NaN and for both zeros.
        let v = if v.is_nan() {
            f64::NAN
        } else if v == 0.0 {
            0.0
        } else {
            v
        };
        Self::FloatBits(v.to_bits())
    }
}

/// Partition `source` by the tuple of `keys`.
///
/// With `null_is_zero`, a null key cell is replaced by the key field's empty value before
/// grouping, so null and zero keys share a group. The field type is the declared type or, failing
/// that, the type of the first non-null key cell.
pub fn group_by<'s, S, K>(
    source: &'s S,
    keys: K,
    null_is_zero: bool,
) -> DataToolsResult<Vec<RecordGroup<'s, S>>>
where
    S: RecordSequenceSource + ?Sized + 's,
    K: IntoIterator,
    K::Item: Into<FieldSelector>,
{
    let names = keys
        .into_iter()
        .map(|k| {
            let selector: FieldSelector = k.into();
            selector.resolve(source).map(|name| name.into_owned())
        })
        .collect::<DataToolsResult<Vec<String>>>()?;

    let zeros = if null_is_zero {
        key_zeros(source, &names)?
    } else {
        vec![None; names.len()]
    };

    let mut groups: Vec<RecordGroup<'s, S>> = Vec::new();
    let mut slot: HashMap<Vec<KeyPart>, usize> = HashMap::new();

    for record in source.records() {
        let mut key = Vec::with_capacity(names.len());
        for (name, zero) in names.iter().zip(&zeros) {
            let cell = record.value(name)?.into_owned();
            key.push(match (cell, zero) {
                (Value::Null, Some(zero)) => zero.clone(),
                (cell, _) => cell,
            });
        }
        let id: Vec<KeyPart> = key.iter().map(KeyPart::of).collect();
        match slot.get(&id) {
            Some(&idx) => groups[idx].records.push(record),
            None => {
                slot.insert(id, groups.len());
                groups.push(RecordGroup {
                    source,
                    key,
                    records: vec![record],
                });
            }
        }
    }
    Ok(groups)
}

/// Empty value for each key field, when its type can be determined.
fn key_zeros<S>(source: &S, names: &[String]) -> DataToolsResult<Vec<Option<Value>>>
where
    S: RecordSequenceSource + ?Sized,
{
    let mut types: Vec<Option<DataType>> = names.iter().map(|n| source.field_type(n)).collect();
    if types.iter().any(Option::is_none) {
        for record in source.records() {
            for (name, ty) in names.iter().zip(types.iter_mut()) {
                if ty.is_none() {
                    *ty = record.value(name)?.data_type();
                }
            }
            if types.iter().all(Option::is_some) {
                break;
            }
        }
    }
    Ok(types
        .into_iter()
        .map(|ty| ty.map(|t| t.empty_value()).filter(|v| !v.is_null()))
        .collect())
}
