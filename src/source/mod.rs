//! Record-source abstractions consumed by the aggregation engine.
//!
//! - [`RecordSource`]: a single container of named cells (a row).
//! - [`RecordSequenceSource`]: a finite, restartable sequence of records sharing field names.
//!
//! Implementations are provided for [`DataSet`] rows, owned [`DataRow`]s, slices and `Vec`s of
//! records, record groups produced by [`crate::processing::group_by`], and Polars
//! `DataFrame`s (see [`frame`]).

pub mod frame;

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::{DataToolsError, DataToolsResult};
use crate::processing::coerce::{self, CellValue};
use crate::types::{DataRow, DataSet, DataType, RowRef, Value};

/// A single record of named cells.
pub trait RecordSource {
    /// Field names, in order. Names are unique.
    fn field_names(&self) -> Vec<&str>;

    fn has_field(&self, name: &str) -> bool {
        self.field_names().contains(&name)
    }

    /// The cell stored under `name`, or [`DataToolsError::FieldNotFound`].
    fn value(&self, name: &str) -> DataToolsResult<Cow<'_, Value>>;

    /// Declared type of a field, when the source carries a schema.
    fn field_type(&self, _name: &str) -> Option<DataType> {
        None
    }

    /// Read a field coerced to `T`; a null cell yields `T`'s empty value.
    fn get_as<T: CellValue>(&self, name: &str) -> DataToolsResult<T>
    where
        Self: Sized,
    {
        coerce::get_as(&*self.value(name)?)
    }

    /// Read a field coerced to `T`; a null cell yields `None`.
    fn try_get_as<T: CellValue>(&self, name: &str) -> DataToolsResult<Option<T>>
    where
        Self: Sized,
    {
        coerce::try_get_as(&*self.value(name)?)
    }
}

/// A finite, restartable sequence of records.
pub trait RecordSequenceSource {
    type Record<'a>: RecordSource
    where
        Self: 'a;

    /// Field names shared by every record, in order.
    fn field_names(&self) -> Vec<&str>;

    fn has_field(&self, name: &str) -> bool {
        self.field_names().contains(&name)
    }

    fn field_type(&self, _name: &str) -> Option<DataType> {
        None
    }

    /// Iterate the records from the start. May be called any number of times.
    fn records(&self) -> impl Iterator<Item = Self::Record<'_>> + '_;
}

/// Identifies a field by name or by zero-based position in the source's field names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSelector {
    Name(String),
    Index(usize),
}

impl FieldSelector {
    /// Resolve to a field name present in `source`.
    pub fn resolve<'s, S>(&self, source: &'s S) -> DataToolsResult<Cow<'s, str>>
    where
        S: RecordSequenceSource + ?Sized,
    {
        self.resolve_with(|name| source.has_field(name), || source.field_names())
    }

    /// Resolve to a field name present in a single record.
    pub fn resolve_in<'r, R>(&self, record: &'r R) -> DataToolsResult<Cow<'r, str>>
    where
        R: RecordSource + ?Sized,
    {
        self.resolve_with(|name| record.has_field(name), || record.field_names())
    }

    fn resolve_with<'s>(
        &self,
        has_field: impl Fn(&str) -> bool,
        field_names: impl FnOnce() -> Vec<&'s str>,
    ) -> DataToolsResult<Cow<'s, str>> {
        match self {
            FieldSelector::Name(name) if has_field(name) => Ok(Cow::Owned(name.clone())),
            FieldSelector::Name(name) => Err(DataToolsError::field_not_found(name.as_str())),
            FieldSelector::Index(idx) => field_names()
                .get(*idx)
                .map(|name| Cow::Borrowed(*name))
                .ok_or_else(|| DataToolsError::field_not_found(format!("#{idx}"))),
        }
    }
}

impl From<&str> for FieldSelector {
    fn from(name: &str) -> Self {
        FieldSelector::Name(name.to_string())
    }
}

impl From<String> for FieldSelector {
    fn from(name: String) -> Self {
        FieldSelector::Name(name)
    }
}

impl From<usize> for FieldSelector {
    fn from(idx: usize) -> Self {
        FieldSelector::Index(idx)
    }
}

impl RecordSource for RowRef<'_> {
    fn field_names(&self) -> Vec<&str> {
        self.schema.field_names().collect()
    }

    fn has_field(&self, name: &str) -> bool {
        self.schema.index_of(name).is_some()
    }

    fn value(&self, name: &str) -> DataToolsResult<Cow<'_, Value>> {
        let idx = self.schema.require(name)?;
        Ok(Cow::Borrowed(self.values.get(idx).unwrap_or(&Value::Null)))
    }

    fn field_type(&self, name: &str) -> Option<DataType> {
        self.schema.field(name).map(|f| f.data_type)
    }
}

impl RecordSource for DataRow {
    fn field_names(&self) -> Vec<&str> {
        self.schema.field_names().collect()
    }

    fn has_field(&self, name: &str) -> bool {
        self.schema.index_of(name).is_some()
    }

    fn value(&self, name: &str) -> DataToolsResult<Cow<'_, Value>> {
        let idx = self.schema.require(name)?;
        Ok(Cow::Borrowed(self.values.get(idx).unwrap_or(&Value::Null)))
    }

    fn field_type(&self, name: &str) -> Option<DataType> {
        self.schema.field(name).map(|f| f.data_type)
    }
}

impl<R: RecordSource + ?Sized> RecordSource for &R {
    fn field_names(&self) -> Vec<&str> {
        (**self).field_names()
    }

    fn has_field(&self, name: &str) -> bool {
        (**self).has_field(name)
    }

    fn value(&self, name: &str) -> DataToolsResult<Cow<'_, Value>> {
        (**self).value(name)
    }

    fn field_type(&self, name: &str) -> Option<DataType> {
        (**self).field_type(name)
    }
}

impl RecordSequenceSource for DataSet {
    type Record<'a> = RowRef<'a>;

    fn field_names(&self) -> Vec<&str> {
        self.schema.field_names().collect()
    }

    fn has_field(&self, name: &str) -> bool {
        self.schema.index_of(name).is_some()
    }

    fn field_type(&self, name: &str) -> Option<DataType> {
        self.schema.field(name).map(|f| f.data_type)
    }

    fn records(&self) -> impl Iterator<Item = Self::Record<'_>> + '_ {
        self.rows.iter().map(|values| RowRef {
            schema: &self.schema,
            values,
        })
    }
}

/// Field names are taken from the first record. An empty slice has no records to contradict a
/// field name, so it accepts any.
impl<R: RecordSource> RecordSequenceSource for [R] {
    type Record<'a>
        = &'a R
    where
        Self: 'a;

    fn field_names(&self) -> Vec<&str> {
        self.first().map(|r| r.field_names()).unwrap_or_default()
    }

    fn has_field(&self, name: &str) -> bool {
        self.first().is_none_or(|r| r.has_field(name))
    }

    fn field_type(&self, name: &str) -> Option<DataType> {
        self.first().and_then(|r| r.field_type(name))
    }

    fn records(&self) -> impl Iterator<Item = Self::Record<'_>> + '_ {
        self.iter()
    }
}

impl<R: RecordSource> RecordSequenceSource for Vec<R> {
    type Record<'a>
        = &'a R
    where
        Self: 'a;

    fn field_names(&self) -> Vec<&str> {
        self.as_slice().field_names()
    }

    fn has_field(&self, name: &str) -> bool {
        self.as_slice().has_field(name)
    }

    fn field_type(&self, name: &str) -> Option<DataType> {
        self.as_slice().field_type(name)
    }

    fn records(&self) -> impl Iterator<Item = Self::Record<'_>> + '_ {
        self.iter()
    }
}

impl DataRow {
    /// Coerce-and-store `v` into field `name`.
    ///
    /// Nullable fields store `T`'s empty value as null; non-nullable fields store it as-is.
    pub fn set_as<T: CellValue>(&mut self, name: &str, v: T) -> DataToolsResult<()> {
        let cell = if self.is_nullable(name)? {
            coerce::set_as(v)
        } else {
            coerce::set_as_non_null(v)
        };
        self.set(name, cell)
    }
}
