//! Arithmetic over dynamically-typed cells with numeric promotion.
//!
//! Operands are promoted along `Int32 < Int64 < Float32 < Float64 < Decimal` and the result takes
//! the higher level. Time spans combine with each other, with date-times, and with dimensionless
//! scalars through multiply/divide.
//!
//! Null rules:
//!
//! - [`add`]/[`subtract`]: a null operand is the identity and the other operand is returned as-is.
//! - [`multiply`]/[`divide`]: a null operand yields null, except that a null divisor is an error.

use std::cmp::Ordering;

use chrono::{NaiveDateTime, TimeDelta};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::error::{DataToolsError, DataToolsResult};
use crate::processing::coerce::{get_as, round_decimal, span_from_nanos, span_nanos};
use crate::types::{DataType, Value};

/// Position of a numeric cell on the promotion lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumericLevel {
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
}

impl NumericLevel {
    /// Lattice level of a cell, or `None` for non-numeric cells (including null).
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Int32(_) => Some(Self::Int32),
            Value::Int64(_) => Some(Self::Int64),
            Value::Float32(_) => Some(Self::Float32),
            Value::Float64(_) => Some(Self::Float64),
            Value::Decimal(_) => Some(Self::Decimal),
            _ => None,
        }
    }

    /// Lattice level of a declared type.
    pub fn of_type(data_type: DataType) -> Option<Self> {
        match data_type {
            DataType::Int32 => Some(Self::Int32),
            DataType::Int64 => Some(Self::Int64),
            DataType::Float32 => Some(Self::Float32),
            DataType::Float64 => Some(Self::Float64),
            DataType::Decimal => Some(Self::Decimal),
            _ => None,
        }
    }

    pub fn data_type(self) -> DataType {
        match self {
            Self::Int32 => DataType::Int32,
            Self::Int64 => DataType::Int64,
            Self::Float32 => DataType::Float32,
            Self::Float64 => DataType::Float64,
            Self::Decimal => DataType::Decimal,
        }
    }
}

/// The type a mix of `a` and `b` cells promotes to, or `None` if they do not combine.
pub fn promoted_type(a: DataType, b: DataType) -> Option<DataType> {
    if a == b {
        return Some(a);
    }
    match (NumericLevel::of_type(a), NumericLevel::of_type(b)) {
        (Some(la), Some(lb)) => Some(la.max(lb).data_type()),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithOp {
    fn name(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Subtract => "subtract",
            ArithOp::Multiply => "multiply",
            ArithOp::Divide => "divide",
        }
    }
}

fn is_arithmetic(value: &Value) -> bool {
    NumericLevel::of(value).is_some() || matches!(value, Value::TimeSpan(_) | Value::DateTime(_))
}

fn invalid(op: &'static str, a: &Value, b: &Value) -> DataToolsError {
    DataToolsError::InvalidOperation {
        op,
        message: format!("{} and {}", a.type_label(), b.type_label()),
    }
}

fn overflow(op: ArithOp) -> DataToolsError {
    DataToolsError::ArithmeticOverflow { op: op.name() }
}

/// `a + b`. A null operand returns the other operand unchanged.
pub fn add(a: &Value, b: &Value) -> DataToolsResult<Value> {
    additive(ArithOp::Add, a, b)
}

/// `a - b`. A null operand returns the other operand unchanged.
pub fn subtract(a: &Value, b: &Value) -> DataToolsResult<Value> {
    additive(ArithOp::Subtract, a, b)
}

/// `a * b`. A null operand yields null.
pub fn multiply(a: &Value, b: &Value) -> DataToolsResult<Value> {
    if a.is_null() || b.is_null() {
        return Ok(Value::Null);
    }
    binary(ArithOp::Multiply, a, b)
}

/// `a / b`.
///
/// Integer division that is not exact promotes the result to `Float64`. Integer, decimal and
/// time-span division by zero fail with [`DataToolsError::DivideByZero`]; float division follows
/// IEEE semantics.
pub fn divide(a: &Value, b: &Value) -> DataToolsResult<Value> {
    if b.is_null() {
        return Err(DataToolsError::InvalidOperation {
            op: "divide",
            message: "divisor is null".to_string(),
        });
    }
    if a.is_null() {
        return Ok(Value::Null);
    }
    binary(ArithOp::Divide, a, b)
}

/// `-a`. Null stays null.
pub fn negate(a: &Value) -> DataToolsResult<Value> {
    let op = "negate";
    Ok(match a {
        Value::Null => Value::Null,
        Value::Int32(v) => Value::Int32(v.checked_neg().ok_or(DataToolsError::ArithmeticOverflow { op })?),
        Value::Int64(v) => Value::Int64(v.checked_neg().ok_or(DataToolsError::ArithmeticOverflow { op })?),
        Value::Float32(v) => Value::Float32(-v),
        Value::Float64(v) => Value::Float64(-v),
        Value::Decimal(v) => Value::Decimal(-*v),
        Value::TimeSpan(v) => Value::TimeSpan(
            TimeDelta::zero()
                .checked_sub(v)
                .ok_or(DataToolsError::ArithmeticOverflow { op })?,
        ),
        other => return Err(invalid(op, other, &Value::Null)),
    })
}

/// `|a|`. Null stays null.
pub fn abs(a: &Value) -> DataToolsResult<Value> {
    let op = "abs";
    Ok(match a {
        Value::Null => Value::Null,
        Value::Int32(v) => Value::Int32(v.checked_abs().ok_or(DataToolsError::ArithmeticOverflow { op })?),
        Value::Int64(v) => Value::Int64(v.checked_abs().ok_or(DataToolsError::ArithmeticOverflow { op })?),
        Value::Float32(v) => Value::Float32(v.abs()),
        Value::Float64(v) => Value::Float64(v.abs()),
        Value::Decimal(v) => Value::Decimal(v.abs()),
        Value::TimeSpan(v) if *v < TimeDelta::zero() => negate(a)?,
        Value::TimeSpan(v) => Value::TimeSpan(*v),
        other => return Err(invalid(op, other, &Value::Null)),
    })
}

/// Divide and round the quotient to the nearest integer, ties away from zero.
///
/// Division by zero is always an error, for float operands too.
pub fn divide_with_rounding(a: &Value, b: &Value) -> DataToolsResult<Value> {
    let op = "divide_with_rounding";
    if b.is_null() {
        return Err(DataToolsError::InvalidOperation {
            op,
            message: "divisor is null".to_string(),
        });
    }
    if a.is_null() {
        return Ok(Value::Null);
    }
    let level = match (NumericLevel::of(a), NumericLevel::of(b)) {
        (Some(la), Some(lb)) => la.max(lb),
        _ => return Err(invalid(op, a, b)),
    };
    Ok(match level {
        NumericLevel::Int32 => {
            let q = rounded_quotient(i128::from(get_as::<i32>(a)?), i128::from(get_as::<i32>(b)?))?;
            Value::Int32(i32::try_from(q).map_err(|_| DataToolsError::ArithmeticOverflow { op })?)
        }
        NumericLevel::Int64 => {
            let q = rounded_quotient(i128::from(get_as::<i64>(a)?), i128::from(get_as::<i64>(b)?))?;
            Value::Int64(i64::try_from(q).map_err(|_| DataToolsError::ArithmeticOverflow { op })?)
        }
        NumericLevel::Float32 | NumericLevel::Float64 => {
            let (x, y) = (get_as::<f64>(a)?, get_as::<f64>(b)?);
            if y == 0.0 {
                return Err(DataToolsError::DivideByZero);
            }
            let q = (x / y).round();
            if level == NumericLevel::Float32 {
                Value::Float32(q as f32)
            } else {
                Value::Float64(q)
            }
        }
        NumericLevel::Decimal => {
            let (x, y) = (get_as::<Decimal>(a)?, get_as::<Decimal>(b)?);
            if y.is_zero() {
                return Err(DataToolsError::DivideByZero);
            }
            let q = x.checked_div(y).ok_or(DataToolsError::ArithmeticOverflow { op })?;
            Value::Decimal(round_decimal(q))
        }
    })
}

/// Order two cells, promoting numeric operands first.
///
/// Date-times and time spans compare only with their own kind.
pub fn compare(a: &Value, b: &Value) -> DataToolsResult<Ordering> {
    let op = "compare";
    let unordered = || DataToolsError::InvalidOperation {
        op,
        message: format!("{} and {} are unordered", a.type_label(), b.type_label()),
    };
    match (NumericLevel::of(a), NumericLevel::of(b)) {
        (Some(la), Some(lb)) => {
            let ord = match la.max(lb) {
                NumericLevel::Int32 | NumericLevel::Int64 => get_as::<i64>(a)?.partial_cmp(&get_as::<i64>(b)?),
                NumericLevel::Float32 | NumericLevel::Float64 => get_as::<f64>(a)?.partial_cmp(&get_as::<f64>(b)?),
                NumericLevel::Decimal => get_as::<Decimal>(a)?.partial_cmp(&get_as::<Decimal>(b)?),
            };
            ord.ok_or_else(unordered)
        }
        _ => match (a, b) {
            (Value::DateTime(x), Value::DateTime(y)) => Ok(x.cmp(y)),
            (Value::TimeSpan(x), Value::TimeSpan(y)) => Ok(x.cmp(y)),
            _ => Err(unordered()),
        },
    }
}

/// Integer quotient rounded half away from zero.
pub(crate) fn rounded_quotient(n: i128, d: i128) -> DataToolsResult<i128> {
    if d == 0 {
        return Err(DataToolsError::DivideByZero);
    }
    let q = n / d;
    let r = n % d;
    if 2 * r.abs() >= d.abs() {
        Ok(q + n.signum() * d.signum())
    } else {
        Ok(q)
    }
}

fn additive(op: ArithOp, a: &Value, b: &Value) -> DataToolsResult<Value> {
    match (a, b) {
        (Value::Null, Value::Null) => Ok(Value::Null),
        (Value::Null, other) | (other, Value::Null) => {
            if is_arithmetic(other) {
                Ok(other.clone())
            } else {
                Err(invalid(op.name(), a, b))
            }
        }
        _ => binary(op, a, b),
    }
}

fn binary(op: ArithOp, a: &Value, b: &Value) -> DataToolsResult<Value> {
    if let (Some(la), Some(lb)) = (NumericLevel::of(a), NumericLevel::of(b)) {
        return numeric(op, la.max(lb), a, b);
    }
    temporal(op, a, b)
}

fn numeric(op: ArithOp, level: NumericLevel, a: &Value, b: &Value) -> DataToolsResult<Value> {
    match level {
        NumericLevel::Int32 => {
            let (x, y) = (get_as::<i32>(a)?, get_as::<i32>(b)?);
            match op {
                ArithOp::Divide => {
                    integer_divide(i64::from(x), i64::from(y), |q| i32::try_from(q).ok().map(Value::Int32))
                }
                _ => {
                    let r = match op {
                        ArithOp::Add => x.checked_add(y),
                        ArithOp::Subtract => x.checked_sub(y),
                        _ => x.checked_mul(y),
                    };
                    r.map(Value::Int32).ok_or_else(|| overflow(op))
                }
            }
        }
        NumericLevel::Int64 => {
            let (x, y) = (get_as::<i64>(a)?, get_as::<i64>(b)?);
            match op {
                ArithOp::Divide => integer_divide(x, y, |q| Some(Value::Int64(q))),
                _ => {
                    let r = match op {
                        ArithOp::Add => x.checked_add(y),
                        ArithOp::Subtract => x.checked_sub(y),
                        _ => x.checked_mul(y),
                    };
                    r.map(Value::Int64).ok_or_else(|| overflow(op))
                }
            }
        }
        NumericLevel::Float32 => {
            let (x, y) = (get_as::<f32>(a)?, get_as::<f32>(b)?);
            Ok(Value::Float32(match op {
                ArithOp::Add => x + y,
                ArithOp::Subtract => x - y,
                ArithOp::Multiply => x * y,
                ArithOp::Divide => x / y,
            }))
        }
        NumericLevel::Float64 => {
            let (x, y) = (get_as::<f64>(a)?, get_as::<f64>(b)?);
            Ok(Value::Float64(match op {
                ArithOp::Add => x + y,
                ArithOp::Subtract => x - y,
                ArithOp::Multiply => x * y,
                ArithOp::Divide => x / y,
            }))
        }
        NumericLevel::Decimal => {
            let (x, y) = (get_as::<Decimal>(a)?, get_as::<Decimal>(b)?);
            if op == ArithOp::Divide && y.is_zero() {
                return Err(DataToolsError::DivideByZero);
            }
            let r = match op {
                ArithOp::Add => x.checked_add(y),
                ArithOp::Subtract => x.checked_sub(y),
                ArithOp::Multiply => x.checked_mul(y),
                ArithOp::Divide => x.checked_div(y),
            };
            r.map(Value::Decimal).ok_or_else(|| overflow(op))
        }
    }
}

/// Exact quotients keep the integer type; anything else becomes `Float64`.
fn integer_divide(x: i64, y: i64, wrap: impl Fn(i64) -> Option<Value>) -> DataToolsResult<Value> {
    if y == 0 {
        return Err(DataToolsError::DivideByZero);
    }
    if x % y == 0 {
        // MIN / -1 is the only exact quotient that leaves the operand range.
        x.checked_div(y)
            .and_then(wrap)
            .ok_or(DataToolsError::ArithmeticOverflow { op: "divide" })
    } else {
        Ok(Value::Float64(x as f64 / y as f64))
    }
}

fn temporal(op: ArithOp, a: &Value, b: &Value) -> DataToolsResult<Value> {
    match (op, a, b) {
        (ArithOp::Add, Value::TimeSpan(x), Value::TimeSpan(y)) => {
            x.checked_add(y).map(Value::TimeSpan).ok_or_else(|| overflow(op))
        }
        (ArithOp::Subtract, Value::TimeSpan(x), Value::TimeSpan(y)) => {
            x.checked_sub(y).map(Value::TimeSpan).ok_or_else(|| overflow(op))
        }
        (ArithOp::Add, Value::DateTime(t), Value::TimeSpan(s))
        | (ArithOp::Add, Value::TimeSpan(s), Value::DateTime(t)) => shift(op, t, *s),
        (ArithOp::Subtract, Value::DateTime(t), Value::TimeSpan(s)) => {
            let negated = TimeDelta::zero().checked_sub(s).ok_or_else(|| overflow(op))?;
            shift(op, t, negated)
        }
        (ArithOp::Subtract, Value::DateTime(x), Value::DateTime(y)) => {
            Ok(Value::TimeSpan(x.signed_duration_since(*y)))
        }
        (ArithOp::Multiply, Value::TimeSpan(s), factor) | (ArithOp::Multiply, factor, Value::TimeSpan(s))
            if NumericLevel::of(factor).is_some() =>
        {
            scale_span(op, s, factor, false)
        }
        (ArithOp::Divide, Value::TimeSpan(s), divisor) if NumericLevel::of(divisor).is_some() => {
            scale_span(op, s, divisor, true)
        }
        (ArithOp::Divide, Value::TimeSpan(x), Value::TimeSpan(y)) => {
            if y.is_zero() {
                return Err(DataToolsError::DivideByZero);
            }
            Ok(Value::Float64(span_nanos(x) as f64 / span_nanos(y) as f64))
        }
        _ => Err(invalid(op.name(), a, b)),
    }
}

fn shift(op: ArithOp, t: &NaiveDateTime, span: TimeDelta) -> DataToolsResult<Value> {
    t.checked_add_signed(span)
        .map(Value::DateTime)
        .ok_or_else(|| overflow(op))
}

/// Multiply or divide a time span by a dimensionless scalar, rounding to whole nanoseconds.
fn scale_span(op: ArithOp, span: &TimeDelta, scalar: &Value, divide: bool) -> DataToolsResult<Value> {
    let nanos = span_nanos(span);
    let scaled: i128 = match NumericLevel::of(scalar) {
        Some(NumericLevel::Int32 | NumericLevel::Int64) => {
            let k = i128::from(get_as::<i64>(scalar)?);
            if divide {
                rounded_quotient(nanos, k)?
            } else {
                nanos.checked_mul(k).ok_or_else(|| overflow(op))?
            }
        }
        Some(NumericLevel::Float32 | NumericLevel::Float64) => {
            let k = get_as::<f64>(scalar)?;
            if divide && k == 0.0 {
                return Err(DataToolsError::DivideByZero);
            }
            let raw = if divide { nanos as f64 / k } else { nanos as f64 * k };
            if !raw.is_finite() || raw.abs() >= i64::MAX as f64 {
                return Err(overflow(op));
            }
            raw.round() as i128
        }
        Some(NumericLevel::Decimal) => {
            let k = get_as::<Decimal>(scalar)?;
            if divide && k.is_zero() {
                return Err(DataToolsError::DivideByZero);
            }
            let n = Decimal::from_i128(nanos).ok_or_else(|| overflow(op))?;
            let raw = if divide { n.checked_div(k) } else { n.checked_mul(k) };
            raw.map(round_decimal)
                .and_then(|d| d.to_i128())
                .ok_or_else(|| overflow(op))?
        }
        None => return Err(invalid(op.name(), &Value::TimeSpan(*span), scalar)),
    };
    span_from_nanos(scaled)
        .map(Value::TimeSpan)
        .ok_or_else(|| overflow(op))
}
