//! Value coercion, arithmetic and aggregation over cells.
//!
//! - [`coerce`]: `get_as` / `try_get_as` / `set_as` between a [`crate::types::Value`] and Rust scalars
//! - [`arithmetic`]: add/subtract/multiply/divide with numeric promotion and null rules
//! - [`flatten`]: lazy leaf traversal of rectangular and jagged arrays ([`ArrayNode`])
//! - [`aggregate`]: typed Sum/Min/Max/Average/MinMax reducers
//! - [`reduce()`]: type-erased reducers dispatching on the field's [`crate::types::DataType`]
//! - [`group_by`]: stable grouping into record groups
//! - [`MinMax`]: immutable (min, max) pair with an empty state
//!
//! ## Example: group → reduce
//!
//! ```rust
//! use rust_data_tools::processing::{group_by, reduce, AggregationRequest, ReduceOp};
//! use rust_data_tools::types::{DataSet, DataType, Field, Schema, Value};
//!
//! let schema = Schema::new(vec![
//!     Field::new("region", DataType::Utf8),
//!     Field::new("amount", DataType::Decimal),
//! ]);
//! let ds = DataSet::new(
//!     schema,
//!     vec![
//!         vec![Value::from("north"), Value::Decimal(10.into())],
//!         vec![Value::from("south"), Value::Decimal(4.into())],
//!         vec![Value::from("north"), Value::Null],
//!     ],
//! );
//!
//! let groups = group_by(&ds, ["region"], false).unwrap();
//! let amount = AggregationRequest::new("amount");
//! let north = reduce(&groups[0], &amount, ReduceOp::Sum).unwrap();
//! assert_eq!(north, Value::Decimal(10.into()));
//! assert_eq!(reduce(&groups[0], &amount, ReduceOp::Count).unwrap(), Value::Int64(1));
//! ```

pub mod aggregate;
pub mod arithmetic;
pub mod coerce;
pub mod flatten;
pub mod group;
pub mod min_max;
pub mod reduce;

pub use aggregate::{
    average, average_cells, max, max_cells, min, min_cells, min_max, min_max_cells, sum, sum_cells,
    AggregationRequest, Ordered, Summable,
};
pub use flatten::ArrayNode;
pub use group::{group_by, RecordGroup};
pub use min_max::MinMax;
pub use reduce::{accumulate, min_max_value, reduce, reduce_cells, Accumulator, ReduceOp};
