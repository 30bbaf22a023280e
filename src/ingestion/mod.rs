//! Schema-driven loading of CSV and JSON files into a [`crate::types::DataSet`].
//!
//! Every raw cell goes through [`crate::processing::coerce::parse_as`], so files and in-memory
//! cells share one canonical text format (ISO-8601 date-times, `[-][d.]hh:mm:ss[.fffffff]`
//! time spans, invariant decimals).
//!
//! The plain `ingest_*` functions are strict: the first cell that does not coerce fails the load.
//! The `*_with_policy` variants and [`ingest_with_report`] take a [`CellPolicy`] and return an
//! [`IngestionReport`] with null and rejection counts per column. [`IngestionObserver`] receives
//! each rejected cell plus the final outcome.

pub mod csv;
pub mod json;
pub mod observer;
pub mod report;
pub mod unified;

pub use observer::{IngestionContext, IngestionObserver, StdErrObserver};
pub use report::{CellPolicy, CellRejection, ColumnReport, IngestionReport, Ingested};
pub use unified::{ingest_from_path, ingest_with_report, IngestionFormat, IngestionOptions};
