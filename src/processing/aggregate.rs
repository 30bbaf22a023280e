//! Typed reducers: Sum, Min, Max, Average and MinMax for each canonical numeric/temporal type.
//!
//! Each reducer comes in two shapes:
//!
//! - over a [`RecordSequenceSource`] with an [`AggregationRequest`] naming the field;
//! - over any iterator of cells (`*_cells`), e.g. [`crate::processing::ArrayNode::leaves`].
//!
//! The element type is chosen at compile time through [`Summable`] / [`Ordered`], and every cell
//! is coerced to it with [`crate::processing::coerce`] rules before folding.
//!
//! Null policy:
//!
//! - Sum always skips nulls; no values yields zero.
//! - Min/Max/MinMax with `skip_nulls = false` count a null as the type's zero, which can win.
//! - Average divides by the non-null count (skip) or the total count (no skip). Integer and time
//!   span averages round half away from zero. An empty count yields zero.
//!
//! ```rust
//! use rust_data_tools::processing::aggregate::{min, sum, AggregationRequest};
//! use rust_data_tools::types::{DataSet, DataType, Field, Schema, Value};
//!
//! let ds = DataSet::new(
//!     Schema::new(vec![Field::new("qty", DataType::Int32)]),
//!     vec![vec![Value::Int32(5)], vec![Value::Null]],
//! );
//! let keep_nulls = AggregationRequest::new("qty").with_skip_nulls(false);
//! assert_eq!(sum::<i32, _>(&ds, &keep_nulls).unwrap(), 5);
//! assert_eq!(min::<i32, _>(&ds, &keep_nulls).unwrap(), 0);
//! assert_eq!(min::<i32, _>(&ds, &AggregationRequest::new("qty")).unwrap(), 5);
//! ```

use chrono::{NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DataToolsResult;
use crate::processing::coerce::{get_as, CellValue};
use crate::processing::min_max::MinMax;
use crate::processing::reduce::{accumulate_sequence, Accumulator, ReduceOp};
use crate::source::{FieldSelector, RecordSequenceSource};
use crate::types::Value;

/// Which field to reduce and how to treat nulls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationRequest {
    pub field: FieldSelector,
    /// Ignore null cells (`true`) or count them as the type's zero (`false`).
    #[serde(default = "default_skip_nulls")]
    pub skip_nulls: bool,
}

fn default_skip_nulls() -> bool {
    true
}

impl AggregationRequest {
    /// A request that skips nulls.
    pub fn new(field: impl Into<FieldSelector>) -> Self {
        Self {
            field: field.into(),
            skip_nulls: true,
        }
    }

    pub fn with_skip_nulls(mut self, skip_nulls: bool) -> Self {
        self.skip_nulls = skip_nulls;
        self
    }
}

/// Types that Min, Max and MinMax are defined for.
pub trait Ordered: CellValue + PartialOrd + Clone {}

/// Types that Sum and Average are defined for. `NaiveDateTime` is ordered but not summable.
pub trait Summable: Ordered {}

impl Ordered for i32 {}
impl Ordered for i64 {}
impl Ordered for f32 {}
impl Ordered for f64 {}
impl Ordered for Decimal {}
impl Ordered for TimeDelta {}
impl Ordered for NaiveDateTime {}

impl Summable for i32 {}
impl Summable for i64 {}
impl Summable for f32 {}
impl Summable for f64 {}
impl Summable for Decimal {}
impl Summable for TimeDelta {}

fn over_source<T, S>(source: &S, request: &AggregationRequest, op: ReduceOp) -> DataToolsResult<Accumulator>
where
    T: CellValue,
    S: RecordSequenceSource + ?Sized,
{
    accumulate_sequence(source, request, op, Some(T::DATA_TYPE))
}

fn over_cells<'a, T, I>(cells: I, op: ReduceOp, skip_nulls: bool) -> DataToolsResult<Accumulator>
where
    T: CellValue,
    I: IntoIterator<Item = &'a Value>,
{
    let mut acc = Accumulator::new(op, Some(T::DATA_TYPE), skip_nulls)?;
    acc.extend(cells)?;
    Ok(acc)
}

fn finish_as<T: CellValue>(acc: &Accumulator) -> DataToolsResult<T> {
    get_as(&acc.finish()?)
}

fn bounds_as<T: Ordered>(acc: &Accumulator) -> DataToolsResult<MinMax<T>> {
    match acc.min_max()?.into_pair() {
        None => Ok(MinMax::empty()),
        Some((lo, hi)) => Ok(MinMax::new(get_as(&lo)?, get_as(&hi)?)),
    }
}

/// Sum of a field. Nulls are skipped regardless of `skip_nulls`.
pub fn sum<T, S>(source: &S, request: &AggregationRequest) -> DataToolsResult<T>
where
    T: Summable,
    S: RecordSequenceSource + ?Sized,
{
    finish_as(&over_source::<T, S>(source, request, ReduceOp::Sum)?)
}

pub fn min<T, S>(source: &S, request: &AggregationRequest) -> DataToolsResult<T>
where
    T: Ordered,
    S: RecordSequenceSource + ?Sized,
{
    finish_as(&over_source::<T, S>(source, request, ReduceOp::Min)?)
}

pub fn max<T, S>(source: &S, request: &AggregationRequest) -> DataToolsResult<T>
where
    T: Ordered,
    S: RecordSequenceSource + ?Sized,
{
    finish_as(&over_source::<T, S>(source, request, ReduceOp::Max)?)
}

pub fn average<T, S>(source: &S, request: &AggregationRequest) -> DataToolsResult<T>
where
    T: Summable,
    S: RecordSequenceSource + ?Sized,
{
    finish_as(&over_source::<T, S>(source, request, ReduceOp::Average)?)
}

/// Min and Max of a field in one pass; empty when there is nothing to compare.
pub fn min_max<T, S>(source: &S, request: &AggregationRequest) -> DataToolsResult<MinMax<T>>
where
    T: Ordered,
    S: RecordSequenceSource + ?Sized,
{
    bounds_as(&over_source::<T, S>(source, request, ReduceOp::Min)?)
}

pub fn sum_cells<'a, T, I>(cells: I) -> DataToolsResult<T>
where
    T: Summable,
    I: IntoIterator<Item = &'a Value>,
{
    finish_as(&over_cells::<T, I>(cells, ReduceOp::Sum, true)?)
}

pub fn min_cells<'a, T, I>(cells: I, skip_nulls: bool) -> DataToolsResult<T>
where
    T: Ordered,
    I: IntoIterator<Item = &'a Value>,
{
    finish_as(&over_cells::<T, I>(cells, ReduceOp::Min, skip_nulls)?)
}

pub fn max_cells<'a, T, I>(cells: I, skip_nulls: bool) -> DataToolsResult<T>
where
    T: Ordered,
    I: IntoIterator<Item = &'a Value>,
{
    finish_as(&over_cells::<T, I>(cells, ReduceOp::Max, skip_nulls)?)
}

pub fn average_cells<'a, T, I>(cells: I, skip_nulls: bool) -> DataToolsResult<T>
where
    T: Summable,
    I: IntoIterator<Item = &'a Value>,
{
    finish_as(&over_cells::<T, I>(cells, ReduceOp::Average, skip_nulls)?)
}

pub fn min_max_cells<'a, T, I>(cells: I, skip_nulls: bool) -> DataToolsResult<MinMax<T>>
where
    T: Ordered,
    I: IntoIterator<Item = &'a Value>,
{
    bounds_as(&over_cells::<T, I>(cells, ReduceOp::Min, skip_nulls)?)
}
