//! Conversions between dynamically-typed cells and canonical Rust scalars.
//!
//! - [`get_as`] never fails on a null cell: it returns the target type's empty value.
//! - [`try_get_as`] maps a null cell to `None`.
//! - Both fail with [`DataToolsError::Coercion`] when a non-null cell has no conversion.
//! - [`set_as`] stores a type's empty value as [`Value::Null`]; [`set_as_non_null`] stores it
//!   as itself.
//!
//! Numeric-to-integer conversions round to the nearest integer with ties away from zero, for
//! `f32`, `f64` and [`Decimal`] sources alike. Text is parsed with the invariant, `.`-separated
//! grammar, and text produced by [`format_canonical`] parses back to the same value.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::error::{DataToolsError, DataToolsResult};
use crate::types::{datetime_min, DataType, Value};

const NANOS_PER_SECOND: i128 = 1_000_000_000;
const NANOS_PER_DAY: i128 = 86_400 * NANOS_PER_SECOND;
/// Largest day count accepted when parsing a time span.
const MAX_SPAN_DAYS: i64 = 10_675_199;

/// A Rust scalar that a [`Value`] can be coerced into and written from.
pub trait CellValue: Sized {
    /// Canonical type produced by [`CellValue::into_cell`].
    const DATA_TYPE: DataType;

    /// The type's single empty representation.
    fn empty() -> Self;

    /// Whether `self` equals [`CellValue::empty`].
    fn is_empty(&self) -> bool;

    /// Convert a non-null cell.
    fn from_cell(value: &Value) -> DataToolsResult<Self>;

    /// Wrap `self` as a cell.
    fn into_cell(self) -> Value;
}

/// Read a cell as `T`. Null yields `T::empty()`.
pub fn get_as<T: CellValue>(value: &Value) -> DataToolsResult<T> {
    match value {
        Value::Null => Ok(T::empty()),
        other => T::from_cell(other),
    }
}

/// Read a cell as `Option<T>`. Null yields `None`.
pub fn try_get_as<T: CellValue>(value: &Value) -> DataToolsResult<Option<T>> {
    match value {
        Value::Null => Ok(None),
        other => T::from_cell(other).map(Some),
    }
}

/// Write `v` into a nullable slot: the empty value becomes [`Value::Null`].
pub fn set_as<T: CellValue>(v: T) -> Value {
    if v.is_empty() { Value::Null } else { v.into_cell() }
}

/// Write `v` into a non-nullable slot: the empty value is stored as itself.
pub fn set_as_non_null<T: CellValue>(v: T) -> Value {
    v.into_cell()
}

/// Write an optional value: `None` becomes [`Value::Null`], `Some` is stored as-is.
pub fn set_opt<T: CellValue>(v: Option<T>) -> Value {
    v.map(CellValue::into_cell).unwrap_or(Value::Null)
}

/// Type-erased coercion. Null stays null.
pub fn coerce_to(value: &Value, to: DataType) -> DataToolsResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    Ok(match to {
        DataType::Int32 => Value::Int32(i32::from_cell(value)?),
        DataType::Int64 => Value::Int64(i64::from_cell(value)?),
        DataType::Float32 => Value::Float32(f32::from_cell(value)?),
        DataType::Float64 => Value::Float64(f64::from_cell(value)?),
        DataType::Decimal => Value::Decimal(Decimal::from_cell(value)?),
        DataType::Bool => Value::Bool(bool::from_cell(value)?),
        DataType::DateTime => Value::DateTime(NaiveDateTime::from_cell(value)?),
        DataType::TimeSpan => Value::TimeSpan(TimeDelta::from_cell(value)?),
        DataType::Guid => Value::Guid(Uuid::from_cell(value)?),
        DataType::Utf8 => Value::Utf8(String::from_cell(value)?),
        DataType::Binary => Value::Binary(Vec::<u8>::from_cell(value)?),
        DataType::Object => match value {
            Value::Object(_) => value.clone(),
            other => return Err(unsupported(other, DataType::Object)),
        },
    })
}

/// Parse raw text into a cell of type `to`. Blank text yields [`Value::Null`].
pub fn parse_as(raw: &str, to: DataType) -> DataToolsResult<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    coerce_to(&Value::Utf8(trimmed.to_string()), to)
}

/// Canonical, culture-invariant text form of a cell. Null formats as the empty string.
pub fn format_canonical(value: &Value) -> DataToolsResult<String> {
    Ok(match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Int32(v) => v.to_string(),
        Value::Int64(v) => v.to_string(),
        Value::Float32(v) => v.to_string(),
        Value::Float64(v) => v.to_string(),
        Value::Decimal(v) => v.to_string(),
        Value::DateTime(v) => format_datetime(v),
        Value::TimeSpan(v) => format_timespan(v),
        Value::Guid(v) => v.hyphenated().to_string(),
        Value::Utf8(s) => s.clone(),
        other => return Err(unsupported(other, DataType::Utf8)),
    })
}

/// Round to the nearest integer, ties away from zero.
pub fn round_half_away_from_zero(v: f64) -> f64 {
    // `f64::round` already breaks ties away from zero.
    v.round()
}

/// Round a decimal to an integral value, ties away from zero.
pub fn round_decimal(v: Decimal) -> Decimal {
    v.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

fn unsupported(value: &Value, to: DataType) -> DataToolsError {
    DataToolsError::coercion(value.type_label(), to, "no conversion defined")
}

fn malformed(text: &str, to: DataType, detail: impl std::fmt::Display) -> DataToolsError {
    DataToolsError::coercion(format!("Utf8 '{text}'"), to, detail.to_string())
}

fn float_to_i64(v: f64, from: &Value, to: DataType) -> DataToolsResult<i64> {
    if !v.is_finite() {
        return Err(DataToolsError::coercion(from.type_label(), to, "value is not finite"));
    }
    let rounded = round_half_away_from_zero(v);
    // i64::MAX is not representable as f64; 2^63 is the first out-of-range value.
    if rounded < i64::MIN as f64 || rounded >= 9_223_372_036_854_775_808.0 {
        return Err(DataToolsError::coercion(from.type_label(), to, "value out of range"));
    }
    Ok(rounded as i64)
}

/// A finite source that only overflows once narrowed to `f32` is out of range.
fn narrowed_f32(source: f64, narrowed: f32, from: &Value) -> DataToolsResult<f32> {
    if source.is_finite() && !narrowed.is_finite() {
        return Err(DataToolsError::coercion(from.type_label(), DataType::Float32, "value out of range"));
    }
    Ok(narrowed)
}

fn integer_from_cell(value: &Value, to: DataType) -> DataToolsResult<i64> {
    match value {
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Int32(v) => Ok(i64::from(*v)),
        Value::Int64(v) => Ok(*v),
        Value::Float32(v) => float_to_i64(f64::from(*v), value, to),
        Value::Float64(v) => float_to_i64(*v, value, to),
        Value::Decimal(d) => round_decimal(*d)
            .to_i64()
            .ok_or_else(|| DataToolsError::coercion(value.type_label(), to, "value out of range")),
        Value::Utf8(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(0);
            }
            trimmed.parse::<i64>().map_err(|e| malformed(s, to, e))
        }
        other => Err(unsupported(other, to)),
    }
}

fn float_from_cell(value: &Value, to: DataType) -> DataToolsResult<f64> {
    match value {
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Int32(v) => Ok(f64::from(*v)),
        Value::Int64(v) => Ok(*v as f64),
        Value::Float32(v) => Ok(f64::from(*v)),
        Value::Float64(v) => Ok(*v),
        Value::Decimal(d) => d
            .to_f64()
            .ok_or_else(|| DataToolsError::coercion(value.type_label(), to, "value out of range")),
        Value::Utf8(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(0.0);
            }
            trimmed.parse::<f64>().map_err(|e| malformed(s, to, e))
        }
        other => Err(unsupported(other, to)),
    }
}

impl CellValue for i32 {
    const DATA_TYPE: DataType = DataType::Int32;

    fn empty() -> Self {
        0
    }

    fn is_empty(&self) -> bool {
        *self == 0
    }

    fn from_cell(value: &Value) -> DataToolsResult<Self> {
        if let Value::Int32(v) = value {
            return Ok(*v);
        }
        let wide = integer_from_cell(value, DataType::Int32)?;
        i32::try_from(wide)
            .map_err(|_| DataToolsError::coercion(value.type_label(), DataType::Int32, "value out of range"))
    }

    fn into_cell(self) -> Value {
        Value::Int32(self)
    }
}

impl CellValue for i64 {
    const DATA_TYPE: DataType = DataType::Int64;

    fn empty() -> Self {
        0
    }

    fn is_empty(&self) -> bool {
        *self == 0
    }

    fn from_cell(value: &Value) -> DataToolsResult<Self> {
        integer_from_cell(value, DataType::Int64)
    }

    fn into_cell(self) -> Value {
        Value::Int64(self)
    }
}

impl CellValue for f32 {
    const DATA_TYPE: DataType = DataType::Float32;

    fn empty() -> Self {
        0.0
    }

    fn is_empty(&self) -> bool {
        *self == 0.0
    }

    fn from_cell(value: &Value) -> DataToolsResult<Self> {
        match value {
            Value::Float32(v) => Ok(*v),
            Value::Utf8(s) if !s.trim().is_empty() => {
                let v = s.trim().parse::<f32>().map_err(|e| malformed(s, DataType::Float32, e))?;
                let wide = s.trim().parse::<f64>().unwrap_or(f64::from(v));
                narrowed_f32(wide, v, value)
            }
            other => {
                let wide = float_from_cell(other, DataType::Float32)?;
                narrowed_f32(wide, wide as f32, value)
            }
        }
    }

    fn into_cell(self) -> Value {
        Value::Float32(self)
    }
}

impl CellValue for f64 {
    const DATA_TYPE: DataType = DataType::Float64;

    fn empty() -> Self {
        0.0
    }

    fn is_empty(&self) -> bool {
        *self == 0.0
    }

    fn from_cell(value: &Value) -> DataToolsResult<Self> {
        float_from_cell(value, DataType::Float64)
    }

    fn into_cell(self) -> Value {
        Value::Float64(self)
    }
}

impl CellValue for Decimal {
    const DATA_TYPE: DataType = DataType::Decimal;

    fn empty() -> Self {
        Decimal::ZERO
    }

    fn is_empty(&self) -> bool {
        self.is_zero()
    }

    fn from_cell(value: &Value) -> DataToolsResult<Self> {
        let out_of_range =
            || DataToolsError::coercion(value.type_label(), DataType::Decimal, "value out of range");
        match value {
            Value::Decimal(d) => Ok(*d),
            Value::Bool(b) => Ok(Decimal::from(u8::from(*b))),
            Value::Int32(v) => Ok(Decimal::from(*v)),
            Value::Int64(v) => Ok(Decimal::from(*v)),
            Value::Float32(v) => Decimal::from_f32(*v).ok_or_else(out_of_range),
            Value::Float64(v) => Decimal::from_f64(*v).ok_or_else(out_of_range),
            Value::Utf8(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(Decimal::ZERO);
                }
                trimmed
                    .parse::<Decimal>()
                    .or_else(|_| Decimal::from_scientific(trimmed))
                    .map_err(|e| malformed(s, DataType::Decimal, e))
            }
            other => Err(unsupported(other, DataType::Decimal)),
        }
    }

    fn into_cell(self) -> Value {
        Value::Decimal(self)
    }
}

impl CellValue for bool {
    const DATA_TYPE: DataType = DataType::Bool;

    fn empty() -> Self {
        false
    }

    fn is_empty(&self) -> bool {
        !*self
    }

    fn from_cell(value: &Value) -> DataToolsResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int32(v) => Ok(*v != 0),
            Value::Int64(v) => Ok(*v != 0),
            Value::Float32(v) => Ok(*v != 0.0),
            Value::Float64(v) => Ok(*v != 0.0),
            Value::Decimal(d) => Ok(!d.is_zero()),
            Value::Utf8(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Ok(false)
                } else if trimmed.eq_ignore_ascii_case("true") {
                    Ok(true)
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Ok(false)
                } else {
                    Err(malformed(s, DataType::Bool, "expected 'true' or 'false'"))
                }
            }
            other => Err(unsupported(other, DataType::Bool)),
        }
    }

    fn into_cell(self) -> Value {
        Value::Bool(self)
    }
}

impl CellValue for NaiveDateTime {
    const DATA_TYPE: DataType = DataType::DateTime;

    fn empty() -> Self {
        datetime_min()
    }

    fn is_empty(&self) -> bool {
        *self == datetime_min()
    }

    fn from_cell(value: &Value) -> DataToolsResult<Self> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            Value::TimeSpan(span) => {
                // Only the time of day survives the projection onto the epoch date.
                let within_day = span_nanos(span).rem_euclid(NANOS_PER_DAY);
                datetime_min()
                    .checked_add_signed(TimeDelta::nanoseconds(within_day as i64))
                    .ok_or_else(|| {
                        DataToolsError::coercion(value.type_label(), DataType::DateTime, "value out of range")
                    })
            }
            Value::Utf8(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(datetime_min());
                }
                parse_datetime(trimmed).ok_or_else(|| malformed(s, DataType::DateTime, "unrecognized date-time"))
            }
            other => Err(unsupported(other, DataType::DateTime)),
        }
    }

    fn into_cell(self) -> Value {
        Value::DateTime(self)
    }
}

impl CellValue for TimeDelta {
    const DATA_TYPE: DataType = DataType::TimeSpan;

    fn empty() -> Self {
        TimeDelta::zero()
    }

    fn is_empty(&self) -> bool {
        self.is_zero()
    }

    fn from_cell(value: &Value) -> DataToolsResult<Self> {
        match value {
            Value::TimeSpan(span) => Ok(*span),
            Value::DateTime(dt) => Ok(dt.time().signed_duration_since(NaiveTime::default())),
            Value::Utf8(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(TimeDelta::zero());
                }
                parse_timespan(trimmed).map_err(|detail| malformed(s, DataType::TimeSpan, detail))
            }
            other => Err(unsupported(other, DataType::TimeSpan)),
        }
    }

    fn into_cell(self) -> Value {
        Value::TimeSpan(self)
    }
}

impl CellValue for Uuid {
    const DATA_TYPE: DataType = DataType::Guid;

    fn empty() -> Self {
        Uuid::nil()
    }

    fn is_empty(&self) -> bool {
        self.is_nil()
    }

    fn from_cell(value: &Value) -> DataToolsResult<Self> {
        match value {
            Value::Guid(g) => Ok(*g),
            Value::Binary(bytes) => {
                let raw: [u8; 16] = bytes.as_slice().try_into().map_err(|_| {
                    DataToolsError::coercion(
                        value.type_label(),
                        DataType::Guid,
                        format!("expected 16 bytes, got {}", bytes.len()),
                    )
                })?;
                Ok(Uuid::from_bytes_le(raw))
            }
            Value::Utf8(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(Uuid::nil());
                }
                parse_guid(trimmed).ok_or_else(|| malformed(s, DataType::Guid, "unrecognized guid format"))
            }
            other => Err(unsupported(other, DataType::Guid)),
        }
    }

    fn into_cell(self) -> Value {
        Value::Guid(self)
    }
}

impl CellValue for String {
    const DATA_TYPE: DataType = DataType::Utf8;

    fn empty() -> Self {
        String::new()
    }

    fn is_empty(&self) -> bool {
        String::is_empty(self)
    }

    fn from_cell(value: &Value) -> DataToolsResult<Self> {
        format_canonical(value)
    }

    fn into_cell(self) -> Value {
        Value::Utf8(self)
    }
}

impl CellValue for Vec<u8> {
    const DATA_TYPE: DataType = DataType::Binary;

    fn empty() -> Self {
        Vec::new()
    }

    fn is_empty(&self) -> bool {
        Vec::is_empty(self)
    }

    fn from_cell(value: &Value) -> DataToolsResult<Self> {
        match value {
            Value::Binary(b) => Ok(b.clone()),
            Value::Guid(g) => Ok(g.to_bytes_le().to_vec()),
            Value::Utf8(s) if s.is_empty() => Ok(Vec::new()),
            other => Err(unsupported(other, DataType::Binary)),
        }
    }

    fn into_cell(self) -> Value {
        Value::Binary(self)
    }
}

pub(crate) fn span_nanos(span: &TimeDelta) -> i128 {
    // `num_seconds` truncates toward zero and `subsec_nanos` carries the same sign.
    i128::from(span.num_seconds()) * NANOS_PER_SECOND + i128::from(span.subsec_nanos())
}

pub(crate) fn span_from_nanos(nanos: i128) -> Option<TimeDelta> {
    let secs = i64::try_from(nanos.div_euclid(NANOS_PER_SECOND)).ok()?;
    let subsec = u32::try_from(nanos.rem_euclid(NANOS_PER_SECOND)).ok()?;
    TimeDelta::new(secs, subsec)
}

fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::default()))
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
}

/// `[-][d.]hh:mm:ss[.fffffffff]`
fn format_timespan(span: &TimeDelta) -> String {
    let nanos = span_nanos(span);
    let sign = if nanos < 0 { "-" } else { "" };
    let abs = nanos.unsigned_abs();
    let days = abs / NANOS_PER_DAY as u128;
    let rem = abs % NANOS_PER_DAY as u128;
    let secs_total = rem / NANOS_PER_SECOND as u128;
    let frac = rem % NANOS_PER_SECOND as u128;
    let (h, m, s) = (secs_total / 3600, (secs_total / 60) % 60, secs_total % 60);

    let mut out = String::from(sign);
    if days > 0 {
        out.push_str(&format!("{days}."));
    }
    out.push_str(&format!("{h:02}:{m:02}:{s:02}"));
    if frac > 0 {
        out.push_str(&format!(".{frac:09}"));
    }
    out
}

fn parse_timespan(s: &str) -> Result<TimeDelta, String> {
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    let parse_part = |part: &str, what: &str| -> Result<i64, String> {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("invalid {what} component '{part}'"));
        }
        part.parse::<i64>().map_err(|e| format!("invalid {what} component '{part}': {e}"))
    };

    let (days, clock) = match body.find(':') {
        None => (parse_part(body, "days")?, None),
        Some(colon) => match body[..colon].split_once('.') {
            Some((d, _)) => (parse_part(d, "days")?, Some(&body[d.len() + 1..])),
            None => (0, Some(body)),
        },
    };
    if days > MAX_SPAN_DAYS {
        return Err("days out of range".to_string());
    }

    let mut nanos = i128::from(days) * NANOS_PER_DAY;
    if let Some(clock) = clock {
        let parts: Vec<&str> = clock.split(':').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err("expected hh:mm or hh:mm:ss".to_string());
        }
        let hours = parse_part(parts[0], "hours")?;
        let minutes = parse_part(parts[1], "minutes")?;
        let (seconds, frac_nanos) = match parts.get(2) {
            None => (0, 0),
            Some(sec) => match sec.split_once('.') {
                None => (parse_part(sec, "seconds")?, 0),
                Some((whole, frac)) => {
                    if frac.is_empty() || frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(format!("invalid fraction '{frac}'"));
                    }
                    let scaled = format!("{frac:0<9}");
                    (parse_part(whole, "seconds")?, parse_part(&scaled, "fraction")?)
                }
            },
        };
        if hours >= 24 || minutes >= 60 || seconds >= 60 {
            return Err("clock component out of range".to_string());
        }
        nanos += i128::from(hours * 3600 + minutes * 60 + seconds) * NANOS_PER_SECOND + i128::from(frac_nanos);
    }

    if negative {
        nanos = -nanos;
    }
    span_from_nanos(nanos).ok_or_else(|| "time span out of range".to_string())
}

/// Accepts the `N`, `D`, `B` and `P` text forms.
fn parse_guid(s: &str) -> Option<Uuid> {
    let inner = s
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .or_else(|| s.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')))
        .unwrap_or(s);
    // Only the 32-digit and hyphenated layouts are valid inside the delimiters.
    if inner.len() != 32 && inner.len() != 36 {
        return None;
    }
    Uuid::parse_str(inner).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    #[test]
    fn null_yields_empty_value_for_every_type() {
        assert_eq!(get_as::<i32>(&Value::Null).unwrap(), 0);
        assert_eq!(get_as::<i64>(&Value::Null).unwrap(), 0);
        assert_eq!(get_as::<f32>(&Value::Null).unwrap(), 0.0);
        assert_eq!(get_as::<f64>(&Value::Null).unwrap(), 0.0);
        assert_eq!(get_as::<Decimal>(&Value::Null).unwrap(), Decimal::ZERO);
        assert!(!get_as::<bool>(&Value::Null).unwrap());
        assert_eq!(get_as::<NaiveDateTime>(&Value::Null).unwrap(), dt(1, 1, 1, 0, 0, 0));
        assert_eq!(get_as::<TimeDelta>(&Value::Null).unwrap(), TimeDelta::zero());
        assert_eq!(get_as::<Uuid>(&Value::Null).unwrap(), Uuid::nil());
        assert_eq!(get_as::<String>(&Value::Null).unwrap(), "");
        assert_eq!(try_get_as::<i32>(&Value::Null).unwrap(), None);
    }

    #[test]
    fn rounding_ties_go_away_from_zero_for_all_float_sources() {
        for (input, expected) in [(2.5, 3), (-2.5, -3), (0.5, 1), (-0.5, -1), (1.4, 1), (-1.6, -2)] {
            assert_eq!(get_as::<i32>(&Value::Float64(input)).unwrap(), expected, "f64 {input}");
            assert_eq!(get_as::<i32>(&Value::Float32(input as f32)).unwrap(), expected, "f32 {input}");
            let dec = Decimal::from_f64(input).unwrap();
            assert_eq!(get_as::<i32>(&Value::Decimal(dec)).unwrap(), expected, "decimal {input}");
            assert_eq!(get_as::<i64>(&Value::Decimal(dec)).unwrap(), i64::from(expected));
        }
    }

    #[test]
    fn integer_narrowing_is_range_checked() {
        assert_eq!(get_as::<i32>(&Value::Int64(42)).unwrap(), 42);
        assert!(matches!(
            get_as::<i32>(&Value::Int64(i64::from(i32::MAX) + 1)),
            Err(DataToolsError::Coercion { .. })
        ));
        assert!(get_as::<i64>(&Value::Float64(f64::NAN)).is_err());
        assert!(get_as::<i64>(&Value::Float64(1e300)).is_err());
    }

    #[test]
    fn strings_parse_with_invariant_grammar() {
        assert_eq!(get_as::<i32>(&Value::from(" 42 ")).unwrap(), 42);
        assert_eq!(get_as::<f64>(&Value::from("2.75")).unwrap(), 2.75);
        assert_eq!(get_as::<Decimal>(&Value::from("-12.345")).unwrap(), Decimal::new(-12345, 3));
        assert_eq!(get_as::<Decimal>(&Value::from("1e3")).unwrap(), Decimal::from(1000));
        assert_eq!(get_as::<i32>(&Value::from("")).unwrap(), 0);
        assert!(get_as::<i32>(&Value::from("2,5")).is_err());
        assert!(get_as::<i32>(&Value::from("2.5")).is_err());
        assert!(get_as::<f64>(&Value::from("abc")).is_err());
    }

    #[test]
    fn bool_and_numeric_convert_both_ways() {
        assert_eq!(get_as::<i32>(&Value::Bool(true)).unwrap(), 1);
        assert_eq!(get_as::<f64>(&Value::Bool(false)).unwrap(), 0.0);
        assert_eq!(get_as::<Decimal>(&Value::Bool(true)).unwrap(), Decimal::ONE);
        assert!(get_as::<bool>(&Value::Int32(-7)).unwrap());
        assert!(!get_as::<bool>(&Value::Float64(0.0)).unwrap());
        assert!(get_as::<bool>(&Value::from("TRUE")).unwrap());
        assert!(get_as::<bool>(&Value::from("yes")).is_err());
    }

    #[test]
    fn timespan_projects_onto_epoch_time_of_day() {
        let ten_days = TimeDelta::days(10) + TimeDelta::hours(5) + TimeDelta::minutes(30);
        let zero_days = TimeDelta::hours(5) + TimeDelta::minutes(30);
        let a = get_as::<NaiveDateTime>(&Value::TimeSpan(ten_days)).unwrap();
        let b = get_as::<NaiveDateTime>(&Value::TimeSpan(zero_days)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, dt(1, 1, 1, 5, 30, 0));

        let span = get_as::<TimeDelta>(&Value::DateTime(dt(2024, 2, 29, 13, 14, 15))).unwrap();
        assert_eq!(span, TimeDelta::hours(13) + TimeDelta::minutes(14) + TimeDelta::seconds(15));
    }

    #[test]
    fn guid_accepts_bytes_and_all_text_forms() {
        let d = "0f8fad5b-d9cb-469f-a165-70867728950e";
        let g = Uuid::parse_str(d).unwrap();
        for text in [
            "0f8fad5bd9cb469fa16570867728950e".to_string(),
            d.to_string(),
            format!("{{{d}}}"),
            format!("({d})"),
            d.to_uppercase(),
        ] {
            assert_eq!(get_as::<Uuid>(&Value::Utf8(text.clone())).unwrap(), g, "{text}");
        }
        assert_eq!(get_as::<Uuid>(&Value::from("")).unwrap(), Uuid::nil());

        let bytes = g.to_bytes_le().to_vec();
        assert_eq!(get_as::<Uuid>(&Value::Binary(bytes.clone())).unwrap(), g);
        assert_eq!(get_as::<Vec<u8>>(&Value::Guid(g)).unwrap(), bytes);
        assert!(get_as::<Uuid>(&Value::Binary(vec![1, 2, 3])).is_err());
        assert!(get_as::<Uuid>(&Value::from("{0f8fad5bd9cb469fa16570867728950e")).is_err());
    }

    #[test]
    fn illegal_pairings_are_errors_not_defaults() {
        let g = Value::Guid(Uuid::from_u128(7));
        assert!(matches!(get_as::<i32>(&g), Err(DataToolsError::Coercion { .. })));
        assert!(get_as::<f64>(&Value::Binary(vec![0; 4])).is_err());
        assert!(get_as::<TimeDelta>(&Value::Int32(3)).is_err());
        assert!(get_as::<NaiveDateTime>(&Value::Int64(3)).is_err());
        assert!(try_get_as::<i64>(&g).is_err());
    }

    #[test]
    fn set_as_stores_empty_as_null_unless_non_nullable() {
        assert_eq!(set_as(0i32), Value::Null);
        assert_eq!(set_as(String::new()), Value::Null);
        assert_eq!(set_as(Uuid::nil()), Value::Null);
        assert_eq!(set_as(datetime_min()), Value::Null);
        assert_eq!(set_as(5i64), Value::Int64(5));
        assert_eq!(set_as_non_null(0i32), Value::Int32(0));
        assert_eq!(set_as_non_null(TimeDelta::zero()), Value::TimeSpan(TimeDelta::zero()));
        assert_eq!(set_opt::<i32>(None), Value::Null);
        assert_eq!(set_opt(Some(0i32)), Value::Int32(0));
    }

    #[test]
    fn timespan_text_round_trips() {
        let spans = [
            TimeDelta::zero(),
            TimeDelta::hours(5) + TimeDelta::minutes(3),
            TimeDelta::days(3) + TimeDelta::seconds(7) + TimeDelta::nanoseconds(1_500),
            -(TimeDelta::days(1) + TimeDelta::milliseconds(250)),
            TimeDelta::days(MAX_SPAN_DAYS) - TimeDelta::nanoseconds(1),
            -TimeDelta::days(500_000),
        ];
        for span in spans {
            let text = format_canonical(&Value::TimeSpan(span)).unwrap();
            assert_eq!(get_as::<TimeDelta>(&Value::Utf8(text.clone())).unwrap(), span, "{text}");
        }
        assert_eq!(format_canonical(&Value::TimeSpan(TimeDelta::hours(26))).unwrap(), "1.02:00:00");
        assert_eq!(get_as::<TimeDelta>(&Value::from("2")).unwrap(), TimeDelta::days(2));
        assert_eq!(get_as::<TimeDelta>(&Value::from("01:30")).unwrap(), TimeDelta::minutes(90));
        assert!(get_as::<TimeDelta>(&Value::from("25:00:00")).is_err());
        assert!(get_as::<TimeDelta>(&Value::from("10675200")).is_err());
    }

    #[test]
    fn spans_beyond_the_nanosecond_range_are_rebuilt_from_seconds() {
        let nanos = span_nanos(&TimeDelta::days(400_000));
        assert!(nanos > i128::from(i64::MAX));
        assert_eq!(span_from_nanos(nanos), Some(TimeDelta::days(400_000)));
        assert_eq!(span_from_nanos(-nanos - 1), Some(-TimeDelta::days(400_000) - TimeDelta::nanoseconds(1)));
        assert_eq!(span_from_nanos(i128::MAX), None);
    }

    #[test]
    fn narrowing_to_f32_rejects_finite_overflow() {
        assert!(matches!(
            get_as::<f32>(&Value::Float64(1e300)),
            Err(DataToolsError::Coercion { .. })
        ));
        assert!(matches!(get_as::<f32>(&Value::from("1e300")), Err(DataToolsError::Coercion { .. })));
        assert_eq!(get_as::<f32>(&Value::Float64(f64::INFINITY)).unwrap(), f32::INFINITY);
        assert!(get_as::<f32>(&Value::Float64(f64::NAN)).unwrap().is_nan());
        assert_eq!(get_as::<f32>(&Value::Float64(3.5e38)).ok(), None);
        assert_eq!(get_as::<f32>(&Value::Float64(-1.5)).unwrap(), -1.5);
    }

    #[test]
    fn datetime_text_round_trips_and_accepts_common_forms() {
        let value = dt(2023, 7, 14, 8, 9, 10) + TimeDelta::milliseconds(123);
        let text = format_canonical(&Value::DateTime(value)).unwrap();
        assert_eq!(text, "2023-07-14T08:09:10.123");
        assert_eq!(get_as::<NaiveDateTime>(&Value::Utf8(text)).unwrap(), value);
        assert_eq!(
            get_as::<NaiveDateTime>(&Value::from("2023-07-14")).unwrap(),
            dt(2023, 7, 14, 0, 0, 0)
        );
        assert_eq!(
            get_as::<NaiveDateTime>(&Value::from("2023-07-14 08:09:10")).unwrap(),
            dt(2023, 7, 14, 8, 9, 10)
        );
        assert_eq!(
            get_as::<NaiveDateTime>(&Value::from("2023-07-14T10:09:10+02:00")).unwrap(),
            dt(2023, 7, 14, 8, 9, 10)
        );
        assert!(get_as::<NaiveDateTime>(&Value::from("14/07/2023")).is_err());
    }

    #[test]
    fn coerce_to_preserves_null_and_dispatches_by_type() {
        assert_eq!(coerce_to(&Value::Null, DataType::Int32).unwrap(), Value::Null);
        assert_eq!(coerce_to(&Value::Float64(2.5), DataType::Int64).unwrap(), Value::Int64(3));
        assert_eq!(
            coerce_to(&Value::Int32(7), DataType::Utf8).unwrap(),
            Value::Utf8("7".to_string())
        );
        assert_eq!(parse_as("  ", DataType::Decimal).unwrap(), Value::Null);
        assert_eq!(parse_as("1.25", DataType::Float32).unwrap(), Value::Float32(1.25));
        assert!(coerce_to(&Value::Int32(1), DataType::Object).is_err());
    }
}
