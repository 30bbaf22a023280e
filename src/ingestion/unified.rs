//! Path-based loading with format detection.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{DataToolsError, DataToolsResult};
use crate::types::{DataSet, Schema};

use super::observer::{IngestionContext, IngestionObserver};
use super::report::{CellPolicy, Ingested};
use super::{csv, json};

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IngestionFormat {
    Csv,
    /// JSON array of objects, a single object, or NDJSON.
    Json,
}

impl IngestionFormat {
    /// Case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" | "ndjson" | "jsonl" => Some(Self::Json),
            _ => None,
        }
    }
}

/// How [`ingest_from_path`] and [`ingest_with_report`] load a file.
#[derive(Clone, Default)]
pub struct IngestionOptions {
    /// `None` infers the format from the file extension.
    pub format: Option<IngestionFormat>,
    pub policy: CellPolicy,
    pub observer: Option<Arc<dyn IngestionObserver>>,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOptions")
            .field("format", &self.format)
            .field("policy", &self.policy)
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

/// Load a file into a [`DataSet`].
///
/// # Examples
///
/// ```no_run
/// use rust_data_tools::ingestion::{ingest_from_path, IngestionOptions};
/// use rust_data_tools::processing::{sum, AggregationRequest};
/// use rust_data_tools::types::{DataType, Field, Schema};
/// use rust_decimal::Decimal;
///
/// # fn main() -> Result<(), rust_data_tools::DataToolsError> {
/// let schema = Schema::new(vec![
///     Field::new("region", DataType::Utf8),
///     Field::new("amount", DataType::Decimal),
/// ]);
/// let ds = ingest_from_path("sales.csv", &schema, &IngestionOptions::default())?;
/// let total: Decimal = sum(&ds, &AggregationRequest::new("amount"))?;
/// println!("rows={} total={total}", ds.row_count());
/// # Ok(())
/// # }
/// ```
pub fn ingest_from_path(
    path: impl AsRef<Path>,
    schema: &Schema,
    options: &IngestionOptions,
) -> DataToolsResult<DataSet> {
    Ok(ingest_with_report(path, schema, options)?.dataset)
}

/// Load a file and return the per-column report alongside the data.
///
/// The observer sees every rejected cell, then `on_loaded`; or only `on_failed` when the load
/// fails.
///
/// ```no_run
/// use std::sync::Arc;
///
/// use rust_data_tools::ingestion::{ingest_with_report, CellPolicy, IngestionOptions, StdErrObserver};
/// use rust_data_tools::types::{DataType, Field, Schema};
///
/// # fn main() -> Result<(), rust_data_tools::DataToolsError> {
/// let schema = Schema::new(vec![Field::new("qty", DataType::Int64)]);
/// let opts = IngestionOptions {
///     policy: CellPolicy::NullOnFailure,
///     observer: Some(Arc::new(StdErrObserver)),
///     ..IngestionOptions::default()
/// };
/// let loaded = ingest_with_report("orders.ndjson", &schema, &opts)?;
/// for column in &loaded.report.columns {
///     println!("{}: {} rejected", column.name, column.rejected);
/// }
/// # Ok(())
/// # }
/// ```
pub fn ingest_with_report(
    path: impl AsRef<Path>,
    schema: &Schema,
    options: &IngestionOptions,
) -> DataToolsResult<Ingested> {
    let path = path.as_ref();
    let format = match options.format {
        Some(f) => f,
        None => infer_format_from_path(path)?,
    };
    let result = match format {
        IngestionFormat::Csv => csv::ingest_csv_with_policy(path, schema, options.policy),
        IngestionFormat::Json => json::ingest_json_with_policy(path, schema, options.policy),
    };

    if let Some(obs) = options.observer.as_ref() {
        let ctx = IngestionContext {
            path: path.to_path_buf(),
            format,
        };
        match &result {
            Ok(loaded) => {
                for rejection in &loaded.report.rejections {
                    obs.on_cell_rejected(&ctx, rejection);
                }
                obs.on_loaded(&ctx, &loaded.report);
            }
            Err(e) => obs.on_failed(&ctx, e),
        }
    }
    result
}

fn infer_format_from_path(path: &Path) -> DataToolsResult<IngestionFormat> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| DataToolsError::SchemaMismatch {
            message: format!("cannot infer format: path has no extension ({})", path.display()),
        })?;
    IngestionFormat::from_extension(ext).ok_or_else(|| DataToolsError::SchemaMismatch {
        message: format!("cannot infer format from extension '{ext}' ({})", path.display()),
    })
}
