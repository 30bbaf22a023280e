//! `rust-data-tools` converts loosely-typed cells into canonical Rust scalars and aggregates them.
//!
//! It is built around one dynamically-typed cell, [`types::Value`], and a small set of engines
//! over it:
//!
//! - [`processing::coerce`]: `get_as::<T>` / `try_get_as::<T>` / `set_as` between a cell and
//!   `i32`, `i64`, `f32`, `f64`, `Decimal`, `bool`, `NaiveDateTime`, `TimeDelta`, `Uuid` and
//!   `String`, with canonical invariant text and round-half-away-from-zero integer conversion.
//! - [`processing::arithmetic`]: add/subtract/multiply/divide with numeric promotion
//!   (`Int32 < Int64 < Float32 < Float64 < Decimal`) and null-as-identity for `add`.
//! - [`processing::ArrayNode`]: lazy leaf traversal of rectangular and jagged arrays.
//! - [`processing`] reducers: Sum/Min/Max/Average/MinMax over any
//!   [`source::RecordSequenceSource`] (a [`types::DataSet`], rows, record groups, a Polars
//!   `DataFrame`) or over a stream of cells, plus stable [`processing::group_by`].
//! - [`execution::ExecutionEngine`]: the same reducers in parallel row chunks.
//! - [`ingestion`]: schema-driven CSV/JSON loading into a [`types::DataSet`].
//!
//! ## Null handling
//!
//! Nulls are policy, never errors. `get_as` maps null to the type's empty value (`0`, `false`,
//! `""`, ...), `try_get_as` maps it to `None`. Reducers skip nulls by default; with
//! `skip_nulls == false` a null counts as the empty value.
//!
//! ## Example
//!
//! ```rust
//! use rust_data_tools::processing::coerce::{get_as, try_get_as};
//! use rust_data_tools::processing::{reduce, sum, AggregationRequest, ReduceOp};
//! use rust_data_tools::types::{DataSet, DataType, Field, Schema, Value};
//!
//! let schema = Schema::new(vec![
//!     Field::new("id", DataType::Int64),
//!     Field::new("score", DataType::Float64),
//! ]);
//! let ds = DataSet::new(
//!     schema,
//!     vec![
//!         vec![Value::Int64(1), Value::Float64(10.0)],
//!         vec![Value::Int64(2), Value::Null],
//!         vec![Value::Int64(3), Value::Float64(5.0)],
//!     ],
//! );
//!
//! assert_eq!(get_as::<i32>(&Value::Float64(2.5)).unwrap(), 3);
//! assert_eq!(get_as::<i64>(&Value::from(" 42 ")).unwrap(), 42);
//! assert_eq!(try_get_as::<f64>(&Value::Null).unwrap(), None);
//!
//! let score = AggregationRequest::new("score");
//! assert_eq!(sum::<f64, _>(&ds, &score).unwrap(), 15.0);
//! assert_eq!(reduce(&ds, &score, ReduceOp::Average).unwrap(), Value::Float64(7.5));
//! assert_eq!(
//!     reduce(&ds, &score.clone().with_skip_nulls(false), ReduceOp::Average).unwrap(),
//!     Value::Float64(5.0)
//! );
//! ```
//!
//! ## Modules
//!
//! - [`types`]: cells, schema and the in-memory dataset
//! - [`source`]: record-source abstractions and their implementations
//! - [`processing`]: coercion, arithmetic, flattening, reducers and grouping
//! - [`execution`]: parallel chunked reducers with throttling, metrics and observer events
//! - [`ingestion`]: CSV/JSON loading with per-column coercion reports
//! - [`error`]: the crate-wide error type

pub mod error;
pub mod execution;
pub mod ingestion;
pub mod processing;
pub mod source;
pub mod types;

pub use error::{DataToolsError, DataToolsResult};
