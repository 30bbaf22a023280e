//! Type-erased reductions over record sequences, cell iterators and single records.
//!
//! [`Accumulator`] is the one fold used by every entry point: the typed reducers in
//! [`crate::processing::aggregate`], [`reduce`], and the chunked reducers of
//! [`crate::execution::ExecutionEngine`]. With a declared [`DataType`] it coerces every cell to
//! that type; otherwise it folds the raw cells with numeric promotion.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DataToolsError, DataToolsResult};
use crate::processing::aggregate::AggregationRequest;
use crate::processing::arithmetic::{self, rounded_quotient};
use crate::processing::coerce::{coerce_to, get_as, span_from_nanos, span_nanos};
use crate::processing::min_max::MinMax;
use crate::source::{RecordSequenceSource, RecordSource};
use crate::types::{DataType, Value};

/// Built-in reduction operations over a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReduceOp {
    /// Count cells: non-null cells when skipping nulls, all cells otherwise.
    Count,
    /// Sum of non-null cells; zero when there are none.
    Sum,
    /// Smallest cell.
    Min,
    /// Largest cell.
    Max,
    /// Sum divided by the cell count.
    Average,
}

impl ReduceOp {
    pub fn name(&self) -> &'static str {
        match self {
            ReduceOp::Count => "count",
            ReduceOp::Sum => "sum",
            ReduceOp::Min => "min",
            ReduceOp::Max => "max",
            ReduceOp::Average => "average",
        }
    }

    /// Whether this reduction is defined for `data_type`.
    pub fn supports(&self, data_type: DataType) -> bool {
        let summable = data_type.is_numeric() || data_type == DataType::TimeSpan;
        match self {
            ReduceOp::Count => true,
            ReduceOp::Sum | ReduceOp::Average => summable,
            ReduceOp::Min | ReduceOp::Max => summable || data_type == DataType::DateTime,
        }
    }
}

impl std::fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Partial result of one reduction.
///
/// Accumulators built over disjoint parts of the input can be merged; merging in input order gives
/// the same result as a single pass.
///
/// With a declared type every cell is coerced to it before folding. Without one, cells fold as
/// they are: sums go through [`arithmetic::add`] and bounds through [`arithmetic::compare`], and
/// the running type is promoted along the numeric lattice as wider cells arrive.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    op: ReduceOp,
    data_type: Option<DataType>,
    declared: bool,
    skip_nulls: bool,
    sum: Value,
    bounds: MinMax<Value>,
    non_null: usize,
    total: usize,
}

impl Accumulator {
    /// Start a reduction. With `data_type == None` the type follows the cells seen.
    pub fn new(op: ReduceOp, data_type: Option<DataType>, skip_nulls: bool) -> DataToolsResult<Self> {
        if let Some(dt) = data_type {
            check_supported(op, dt)?;
        }
        Ok(Self {
            op,
            data_type,
            declared: data_type.is_some(),
            skip_nulls,
            sum: Value::Null,
            bounds: MinMax::empty(),
            non_null: 0,
            total: 0,
        })
    }

    pub fn op(&self) -> ReduceOp {
        self.op
    }

    /// The declared type, or the promoted type of the cells seen so far.
    pub fn data_type(&self) -> Option<DataType> {
        self.data_type
    }

    /// Cells pushed so far, including nulls.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Fold one cell.
    pub fn push(&mut self, cell: &Value) -> DataToolsResult<()> {
        self.total += 1;
        if cell.is_null() {
            return Ok(());
        }
        self.non_null += 1;
        if self.op == ReduceOp::Count {
            return Ok(());
        }
        let v = match self.data_type {
            Some(dt) if self.declared => coerce_to(cell, dt)?,
            _ => {
                self.widen(cell.data_type())?;
                cell.clone()
            }
        };
        match self.op {
            ReduceOp::Sum | ReduceOp::Average => self.sum = arithmetic::add(&self.sum, &v)?,
            _ if self.declared => self.bounds = self.bounds.extend(v),
            _ => self.bounds = extend_promoted(&self.bounds, v),
        }
        Ok(())
    }

    /// Fold every cell of `cells`.
    pub fn extend<'a, I>(&mut self, cells: I) -> DataToolsResult<()>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        cells.into_iter().try_for_each(|cell| self.push(cell))
    }

    /// Combine with an accumulator built over a later part of the input.
    pub fn merge(&mut self, other: Accumulator) -> DataToolsResult<()> {
        if other.op != self.op || other.skip_nulls != self.skip_nulls {
            return Err(DataToolsError::InvalidOperation {
                op: "merge",
                message: format!("cannot merge {} into {}", other.op, self.op),
            });
        }
        match (self.data_type, other.data_type) {
            (Some(a), Some(b)) if a != b && self.declared && other.declared => {
                return Err(DataToolsError::InvalidOperation {
                    op: "merge",
                    message: format!("partial results of {a} and {b}"),
                });
            }
            (_, Some(b)) => {
                let declared = self.declared;
                self.widen(Some(b))?;
                self.declared = declared && other.declared;
            }
            _ => {}
        }
        self.sum = arithmetic::add(&self.sum, &other.sum)?;
        self.bounds = match other.bounds.into_pair() {
            None => self.bounds.clone(),
            Some((lo, hi)) => extend_promoted(&extend_promoted(&self.bounds, lo), hi),
        };
        self.non_null += other.non_null;
        self.total += other.total;
        Ok(())
    }

    /// Bounds seen so far; with `skip_nulls == false` any null counts as the type's zero.
    ///
    /// Without a declared type, both bounds are returned as the promoted type of all cells.
    pub fn min_max(&self) -> DataToolsResult<MinMax<Value>> {
        let Some(dt) = self.data_type else {
            return Ok(self.bounds.clone());
        };
        let bounds = if !self.skip_nulls && self.non_null < self.total {
            extend_promoted(&self.bounds, dt.empty_value())
        } else {
            self.bounds.clone()
        };
        if self.declared {
            return Ok(bounds);
        }
        match bounds.into_pair() {
            None => Ok(MinMax::empty()),
            Some((lo, hi)) => Ok(MinMax::ordered(coerce_to(&lo, dt)?, coerce_to(&hi, dt)?)),
        }
    }

    /// The reduced value.
    ///
    /// Count is always `Int64`. Other reductions return the type's zero for an empty input, and
    /// [`Value::Null`] when no type was declared and no non-null cell was seen.
    pub fn finish(&self) -> DataToolsResult<Value> {
        if self.op == ReduceOp::Count {
            let n = if self.skip_nulls { self.non_null } else { self.total };
            return Ok(Value::Int64(n as i64));
        }
        let Some(dt) = self.data_type else {
            return Ok(Value::Null);
        };
        let zero = dt.empty_value();
        match self.op {
            ReduceOp::Sum if self.sum.is_null() => Ok(zero),
            ReduceOp::Sum => Ok(self.sum.clone()),
            ReduceOp::Min => Ok(self.min_max()?.min_value().cloned().unwrap_or(zero)),
            ReduceOp::Max => Ok(self.min_max()?.max_value().cloned().unwrap_or(zero)),
            ReduceOp::Average => {
                let count = if self.skip_nulls { self.non_null } else { self.total };
                if count == 0 || self.sum.is_null() {
                    return Ok(zero);
                }
                average(&self.sum, count)
            }
            ReduceOp::Count => unreachable!("count returned above"),
        }
    }

    /// Promote the running type to cover a cell of `data_type`.
    fn widen(&mut self, data_type: Option<DataType>) -> DataToolsResult<()> {
        let dt = data_type.ok_or_else(|| DataToolsError::InvalidOperation {
            op: "reduce",
            message: "cell has no type".to_string(),
        })?;
        check_supported(self.op, dt)?;
        let widened = match self.data_type {
            None => dt,
            Some(current) => arithmetic::promoted_type(current, dt).ok_or_else(|| DataToolsError::InvalidOperation {
                op: self.op.name(),
                message: format!("cannot combine {current} with {dt}"),
            })?,
        };
        self.data_type = Some(widened);
        Ok(())
    }
}

/// Extend `bounds` with `value`, ordering across numeric types by promotion.
///
/// A value unordered against the bounds (NaN) leaves them as they are.
fn extend_promoted(bounds: &MinMax<Value>, value: Value) -> MinMax<Value> {
    let Some((min, max)) = bounds.as_pair() else {
        return MinMax::of(value);
    };
    let below = matches!(arithmetic::compare(&value, min), Ok(Ordering::Less));
    let above = matches!(arithmetic::compare(&value, max), Ok(Ordering::Greater));
    match (below, above) {
        (true, _) => MinMax::ordered(value, max.clone()),
        (_, true) => MinMax::ordered(min.clone(), value),
        _ => bounds.clone(),
    }
}

fn check_supported(op: ReduceOp, data_type: DataType) -> DataToolsResult<()> {
    if op.supports(data_type) {
        Ok(())
    } else {
        Err(DataToolsError::unsupported(op, data_type))
    }
}

/// `sum / count`; integer and time-span quotients round half away from zero.
fn average(sum: &Value, count: usize) -> DataToolsResult<Value> {
    let overflow = || DataToolsError::ArithmeticOverflow { op: "average" };
    let n = count as i128;
    Ok(match sum {
        Value::Int32(v) => Value::Int32(i32::try_from(rounded_quotient(i128::from(*v), n)?).map_err(|_| overflow())?),
        Value::Int64(v) => Value::Int64(i64::try_from(rounded_quotient(i128::from(*v), n)?).map_err(|_| overflow())?),
        Value::Float32(v) => Value::Float32(v / count as f32),
        Value::Float64(v) => Value::Float64(v / count as f64),
        Value::Decimal(v) => Value::Decimal(v.checked_div(Decimal::from(count)).ok_or_else(overflow)?),
        Value::TimeSpan(v) => {
            Value::TimeSpan(span_from_nanos(rounded_quotient(span_nanos(v), n)?).ok_or_else(overflow)?)
        }
        other => {
            return Err(DataToolsError::unsupported(
                ReduceOp::Average,
                other.data_type().unwrap_or(DataType::Object),
            ));
        }
    })
}

/// Fold `request.field` of every record into an [`Accumulator`].
pub(crate) fn accumulate_sequence<S>(
    source: &S,
    request: &AggregationRequest,
    op: ReduceOp,
    data_type: Option<DataType>,
) -> DataToolsResult<Accumulator>
where
    S: RecordSequenceSource + ?Sized,
{
    let name = request.field.resolve(source)?;
    let data_type = data_type.or_else(|| source.field_type(&name));
    let mut acc = Accumulator::new(op, data_type, request.skip_nulls)?;
    for record in source.records() {
        acc.push(&*record.value(&name)?)?;
    }
    Ok(acc)
}

/// Reduce one field of a record sequence, dispatching on the field's type.
///
/// - Unknown fields fail with [`DataToolsError::FieldNotFound`] even when the source is empty.
/// - Unsupported type/op pairs fail with [`DataToolsError::UnsupportedReducerType`].
pub fn reduce<S>(source: &S, request: &AggregationRequest, op: ReduceOp) -> DataToolsResult<Value>
where
    S: RecordSequenceSource + ?Sized,
{
    accumulate_sequence(source, request, op, None)?.finish()
}

/// Reduce a field to a `(min, max)` pair in one pass.
pub fn min_max_value<S>(source: &S, request: &AggregationRequest) -> DataToolsResult<MinMax<Value>>
where
    S: RecordSequenceSource + ?Sized,
{
    accumulate_sequence(source, request, ReduceOp::Min, None)?.min_max()
}

/// Reduce a stream of cells (e.g. [`crate::processing::ArrayNode::leaves`]).
pub fn reduce_cells<'a, I>(cells: I, op: ReduceOp, skip_nulls: bool) -> DataToolsResult<Value>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut acc = Accumulator::new(op, None, skip_nulls)?;
    acc.extend(cells)?;
    acc.finish()
}

/// Fold a single record's cell into a running total and return the new total.
///
/// A null `total` means nothing has been accumulated yet. Average needs a count and cannot be
/// folded into a single cell.
pub fn accumulate<R>(
    total: &Value,
    record: &R,
    request: &AggregationRequest,
    op: ReduceOp,
) -> DataToolsResult<Value>
where
    R: RecordSource + ?Sized,
{
    let name = request.field.resolve_in(record)?;
    let cell = record.value(&name)?;
    let declared = record.field_type(&name);
    if let Some(dt) = declared.or_else(|| cell.data_type()) {
        check_supported(op, dt)?;
    }
    let cell = match (cell.is_null(), declared) {
        (true, _) if request.skip_nulls || op == ReduceOp::Count => Value::Null,
        (true, _) => declared
            .or_else(|| total.data_type())
            .map_or(Value::Null, |dt| dt.empty_value()),
        (false, Some(dt)) if op != ReduceOp::Count => coerce_to(&cell, dt)?,
        (false, _) => cell.into_owned(),
    };
    match op {
        ReduceOp::Count => {
            let seen = match total {
                Value::Null => 0,
                other => get_as::<i64>(other)?,
            };
            let counted = !(cell.is_null() && request.skip_nulls);
            Ok(Value::Int64(seen + i64::from(counted)))
        }
        ReduceOp::Sum => arithmetic::add(total, &cell),
        ReduceOp::Min | ReduceOp::Max => {
            if cell.is_null() {
                return Ok(total.clone());
            }
            if total.is_null() {
                return Ok(cell);
            }
            let ord = arithmetic::compare(&cell, total)?;
            let take = match op {
                ReduceOp::Min => ord.is_lt(),
                _ => ord.is_gt(),
            };
            let promoted = cell
                .data_type()
                .zip(total.data_type())
                .and_then(|(a, b)| arithmetic::promoted_type(a, b));
            let winner = if take { cell } else { total.clone() };
            match promoted {
                Some(dt) => coerce_to(&winner, dt),
                None => Ok(winner),
            }
        }
        ReduceOp::Average => Err(DataToolsError::InvalidOperation {
            op: "accumulate",
            message: "average cannot be folded into a single cell".to_string(),
        }),
    }
}
