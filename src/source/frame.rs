//! Polars `DataFrame` as a record sequence.
//!
//! Each row is exposed as a [`FrameRow`]; cells are converted from Polars `AnyValue`s on read.

use std::borrow::Cow;

use chrono::{NaiveDate, NaiveTime, TimeDelta};
use polars::prelude::{AnyValue, DataFrame, DataType as PolarsType, TimeUnit};
use rust_decimal::Decimal;

use crate::error::{DataToolsError, DataToolsResult};
use crate::source::{RecordSequenceSource, RecordSource};
use crate::types::{DataType, Value};

/// One row of a [`DataFrame`].
#[derive(Debug, Clone, Copy)]
pub struct FrameRow<'a> {
    frame: &'a DataFrame,
    idx: usize,
}

impl FrameRow<'_> {
    pub fn index(&self) -> usize {
        self.idx
    }
}

impl RecordSource for FrameRow<'_> {
    fn field_names(&self) -> Vec<&str> {
        frame_field_names(self.frame)
    }

    fn value(&self, name: &str) -> DataToolsResult<Cow<'_, Value>> {
        let column = self
            .frame
            .column(name)
            .map_err(|_| DataToolsError::field_not_found(name))?;
        let cell = column.get(self.idx)?;
        Ok(Cow::Owned(any_value_to_cell(cell)?))
    }

    fn field_type(&self, name: &str) -> Option<DataType> {
        frame_field_type(self.frame, name)
    }
}

impl RecordSequenceSource for DataFrame {
    type Record<'a> = FrameRow<'a>;

    fn field_names(&self) -> Vec<&str> {
        frame_field_names(self)
    }

    fn field_type(&self, name: &str) -> Option<DataType> {
        frame_field_type(self, name)
    }

    fn records(&self) -> impl Iterator<Item = Self::Record<'_>> + '_ {
        (0..self.height()).map(move |idx| FrameRow { frame: self, idx })
    }
}

fn frame_field_names(frame: &DataFrame) -> Vec<&str> {
    frame
        .get_column_names()
        .into_iter()
        .map(|name| name.as_str())
        .collect()
}

fn frame_field_type(frame: &DataFrame, name: &str) -> Option<DataType> {
    let column = frame.column(name).ok()?;
    match column.dtype() {
        PolarsType::Boolean => Some(DataType::Bool),
        PolarsType::Int8 | PolarsType::Int16 | PolarsType::Int32 | PolarsType::UInt8 | PolarsType::UInt16 => {
            Some(DataType::Int32)
        }
        PolarsType::Int64 | PolarsType::UInt32 | PolarsType::UInt64 => Some(DataType::Int64),
        PolarsType::Float32 => Some(DataType::Float32),
        PolarsType::Float64 => Some(DataType::Float64),
        PolarsType::Decimal(_, _) => Some(DataType::Decimal),
        PolarsType::Date | PolarsType::Datetime(_, _) => Some(DataType::DateTime),
        PolarsType::Duration(_) => Some(DataType::TimeSpan),
        PolarsType::String => Some(DataType::Utf8),
        PolarsType::Binary => Some(DataType::Binary),
        _ => None,
    }
}

/// Convert one Polars cell.
///
/// Datetimes are read as naive UTC wall time. `UInt64` values past `i64::MAX` are carried as
/// decimals so they fail loudly when read back as `Int64`. Types without a canonical counterpart
/// are carried as their display text.
fn any_value_to_cell(value: AnyValue<'_>) -> DataToolsResult<Value> {
    Ok(match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::Int8(v) => Value::Int32(i32::from(v)),
        AnyValue::Int16(v) => Value::Int32(i32::from(v)),
        AnyValue::UInt8(v) => Value::Int32(i32::from(v)),
        AnyValue::UInt16(v) => Value::Int32(i32::from(v)),
        AnyValue::Int32(v) => Value::Int32(v),
        AnyValue::Int64(v) => Value::Int64(v),
        AnyValue::UInt32(v) => Value::Int64(i64::from(v)),
        AnyValue::UInt64(v) => match i64::try_from(v) {
            Ok(v) => Value::Int64(v),
            Err(_) => Value::Decimal(Decimal::from(v)),
        },
        AnyValue::Float32(v) => Value::Float32(v),
        AnyValue::Float64(v) => Value::Float64(v),
        AnyValue::Decimal(v, _, scale) => {
            let scale = u32::try_from(scale).map_err(|_| out_of_range("decimal", DataType::Decimal))?;
            Value::Decimal(
                Decimal::try_from_i128_with_scale(v, scale).map_err(|_| out_of_range("decimal", DataType::Decimal))?,
            )
        }
        AnyValue::Date(days) => {
            let date = NaiveDate::from_ymd_opt(1970, 1, 1)
                .and_then(|epoch| epoch.checked_add_signed(TimeDelta::try_days(i64::from(days))?))
                .ok_or_else(|| out_of_range("date", DataType::DateTime))?;
            Value::DateTime(date.and_time(NaiveTime::default()))
        }
        AnyValue::Datetime(v, unit, _) | AnyValue::DatetimeOwned(v, unit, _) => {
            let instant = match unit {
                TimeUnit::Nanoseconds => Some(chrono::DateTime::from_timestamp_nanos(v)),
                TimeUnit::Microseconds => chrono::DateTime::from_timestamp_micros(v),
                TimeUnit::Milliseconds => chrono::DateTime::from_timestamp_millis(v),
            };
            Value::DateTime(instant.ok_or_else(|| out_of_range("datetime", DataType::DateTime))?.naive_utc())
        }
        AnyValue::Duration(v, unit) => Value::TimeSpan(match unit {
            TimeUnit::Nanoseconds => TimeDelta::nanoseconds(v),
            TimeUnit::Microseconds => TimeDelta::microseconds(v),
            TimeUnit::Milliseconds => {
                TimeDelta::try_milliseconds(v).ok_or_else(|| out_of_range("duration", DataType::TimeSpan))?
            }
        }),
        AnyValue::String(s) => Value::Utf8(s.to_string()),
        AnyValue::StringOwned(s) => Value::Utf8(s.to_string()),
        AnyValue::Binary(b) => Value::Binary(b.to_vec()),
        AnyValue::BinaryOwned(b) => Value::Binary(b),
        other => Value::Utf8(other.to_string()),
    })
}

fn out_of_range(from: &str, to: DataType) -> DataToolsError {
    DataToolsError::coercion(from, to, "value out of range")
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeDelta};
    use polars::prelude::{Column, DataFrame, DataType as PolarsType, NamedFrom, Series};
    use rust_decimal::Decimal;

    use crate::processing::{reduce, AggregationRequest, ReduceOp};
    use crate::source::{RecordSequenceSource, RecordSource};
    use crate::types::{DataType as CellType, Value};

    #[test]
    fn frame_rows_expose_typed_cells() {
        let df = polars::df!(
            "id" => &[1i64, 2, 3],
            "score" => &[Some(1.5f64), None, Some(4.0)],
            "name" => &["a", "b", "c"]
        )
        .unwrap();

        assert_eq!(df.field_names(), vec!["id", "score", "name"]);
        assert_eq!(df.field_type("score"), Some(CellType::Float64));
        assert_eq!(df.field_type("name"), Some(CellType::Utf8));

        let rows: Vec<_> = df.records().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].value("id").unwrap().into_owned(), Value::Int64(2));
        assert_eq!(rows[1].value("score").unwrap().into_owned(), Value::Null);
        assert_eq!(rows[2].get_as::<String>("name").unwrap(), "c");
        assert!(rows[0].value("missing").is_err());
    }

    #[test]
    fn small_integer_columns_are_numeric() {
        let df = polars::df!(
            "i8" => &[-1i8, 2, 3],
            "i16" => &[1i16, 2, 3],
            "u8" => &[250u8, 1, 2],
            "u16" => &[1u16, 2, 60_000]
        )
        .unwrap();

        for name in ["i8", "i16", "u8", "u16"] {
            assert_eq!(df.field_type(name), Some(CellType::Int32), "{name}");
        }
        let sum = |name: &str| reduce(&df, &AggregationRequest::new(name), ReduceOp::Sum).unwrap();
        assert_eq!(sum("i8"), Value::Int32(4));
        assert_eq!(sum("i16"), Value::Int32(6));
        assert_eq!(sum("u8"), Value::Int32(253));
        assert_eq!(sum("u16"), Value::Int32(60_003));
    }

    #[test]
    fn temporal_columns_convert_to_datetime_and_time_span() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let df = polars::df!(
            "day" => &[day, day.succ_opt().unwrap()],
            "at" => &[day.and_hms_opt(8, 0, 0).unwrap(), day.and_hms_opt(17, 30, 0).unwrap()],
            "took" => &[TimeDelta::minutes(62), TimeDelta::hours(2)]
        )
        .unwrap();

        assert_eq!(df.field_type("day"), Some(CellType::DateTime));
        assert_eq!(df.field_type("at"), Some(CellType::DateTime));
        assert_eq!(df.field_type("took"), Some(CellType::TimeSpan));

        let first = df.records().next().unwrap();
        assert_eq!(
            first.value("day").unwrap().into_owned(),
            Value::DateTime(day.and_hms_opt(0, 0, 0).unwrap())
        );
        assert_eq!(
            reduce(&df, &AggregationRequest::new("at"), ReduceOp::Max).unwrap(),
            Value::DateTime(day.and_hms_opt(17, 30, 0).unwrap())
        );
        assert_eq!(
            reduce(&df, &AggregationRequest::new("took"), ReduceOp::Sum).unwrap(),
            Value::TimeSpan(TimeDelta::minutes(182))
        );
    }

    #[test]
    fn decimal_columns_keep_their_scale() {
        let cents = Series::new("price".into(), &[1250i64, 5])
            .cast(&PolarsType::Decimal(10, 2))
            .unwrap();
        let df = DataFrame::new_infer_height(vec![Column::from(cents)]).unwrap();

        assert_eq!(df.field_type("price"), Some(CellType::Decimal));
        assert_eq!(
            reduce(&df, &AggregationRequest::new("price"), ReduceOp::Sum).unwrap(),
            Value::Decimal(Decimal::from(1255))
        );
    }
}
