//! Callbacks fired while a file is loaded.

use std::path::PathBuf;

use crate::error::DataToolsError;

use super::report::{CellRejection, IngestionReport};
use super::unified::IngestionFormat;

/// The file being loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionContext {
    pub path: PathBuf,
    pub format: IngestionFormat,
}

/// Receives cell-level and load-level outcomes from [`super::ingest_with_report`].
///
/// Rejections are delivered after the file has been read, in source order, and only under
/// [`super::CellPolicy::NullOnFailure`].
pub trait IngestionObserver: Send + Sync {
    fn on_cell_rejected(&self, _ctx: &IngestionContext, _rejection: &CellRejection) {}

    fn on_loaded(&self, _ctx: &IngestionContext, _report: &IngestionReport) {}

    fn on_failed(&self, _ctx: &IngestionContext, _error: &DataToolsError) {}
}

/// Writes one line per event to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdErrObserver;

impl IngestionObserver for StdErrObserver {
    fn on_cell_rejected(&self, ctx: &IngestionContext, rejection: &CellRejection) {
        eprintln!("[ingest][reject] path={} {rejection}", ctx.path.display());
    }

    fn on_loaded(&self, ctx: &IngestionContext, report: &IngestionReport) {
        let rejected: Vec<String> = report
            .columns
            .iter()
            .filter(|c| c.rejected > 0)
            .map(|c| format!("{}={}", c.name, c.rejected))
            .collect();
        eprintln!(
            "[ingest][ok] format={:?} path={} rows={} nulls={} rejected=[{}]",
            ctx.format,
            ctx.path.display(),
            report.rows,
            report.null_cells(),
            rejected.join(",")
        );
    }

    fn on_failed(&self, ctx: &IngestionContext, error: &DataToolsError) {
        eprintln!("[ingest][fail] format={:?} path={} err={error}", ctx.format, ctx.path.display());
    }
}
