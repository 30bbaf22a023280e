use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::processing::coerce::format_canonical;
use crate::processing::{MinMax, ReduceOp};
use crate::types::Value;

/// Execution events emitted by the engine.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted,
    ThrottleWaited { duration: Duration },
    ChunkStarted { start_row: usize, row_count: usize },
    /// A chunk was folded into a partial result.
    ChunkFinished { row_count: usize },
    ReduceStarted { field: String, op: ReduceOp },
    ReduceFinished { op: ReduceOp, result: Value },
    MinMaxFinished { bounds: MinMax<Value> },
    ReduceFailed { message: String },
    RunFinished {
        elapsed: Duration,
        metrics: ExecutionMetricsSnapshot,
    },
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        other => format_canonical(other).unwrap_or_else(|_| other.type_label()),
    }
}

impl fmt::Display for ExecutionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionEvent::RunStarted => write!(f, "run started"),
            ExecutionEvent::ThrottleWaited { duration } => write!(f, "throttled for {duration:?}"),
            ExecutionEvent::ChunkStarted { start_row, row_count } => {
                write!(f, "chunk started at row {start_row} ({row_count} rows)")
            }
            ExecutionEvent::ChunkFinished { row_count } => write!(f, "chunk finished ({row_count} rows)"),
            ExecutionEvent::ReduceStarted { field, op } => write!(f, "{op}({field}) started"),
            ExecutionEvent::ReduceFinished { op, result } => write!(f, "{op} = {}", cell_text(result)),
            ExecutionEvent::MinMaxFinished { bounds } => match bounds.as_pair() {
                Some((lo, hi)) => write!(f, "min_max = ({}, {})", cell_text(lo), cell_text(hi)),
                None => write!(f, "min_max = empty"),
            },
            ExecutionEvent::ReduceFailed { message } => write!(f, "reduce failed: {message}"),
            ExecutionEvent::RunFinished { elapsed, metrics } => {
                write!(f, "run finished in {elapsed:?} [{metrics}]")
            }
        }
    }
}

/// Observer hook for execution events.
pub trait ExecutionObserver: Send + Sync {
    fn on_event(&self, event: &ExecutionEvent);
}

/// Writes one line per event to stderr.
#[derive(Default)]
pub struct StdErrExecutionObserver;

impl ExecutionObserver for StdErrExecutionObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        eprintln!("[execution] {event}");
    }
}

/// Real-time counters for the current run.
///
/// The engine updates these while it works; callers can snapshot them at any time, including
/// from an observer while a run is still in progress.
pub struct ExecutionMetrics {
    run_id: AtomicU64,
    started_at: Mutex<Option<Instant>>,
    elapsed_ns: AtomicU64,

    rows_processed: AtomicU64,
    chunks_started: AtomicU64,
    chunks_finished: AtomicU64,
    partials_merged: AtomicU64,
    throttle_wait_ns: AtomicU64,

    active_chunks: AtomicUsize,
    max_active_chunks: AtomicUsize,
}

fn saturating_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

impl ExecutionMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            started_at: Mutex::new(None),
            elapsed_ns: AtomicU64::new(0),
            rows_processed: AtomicU64::new(0),
            chunks_started: AtomicU64::new(0),
            chunks_finished: AtomicU64::new(0),
            partials_merged: AtomicU64::new(0),
            throttle_wait_ns: AtomicU64::new(0),
            active_chunks: AtomicUsize::new(0),
            max_active_chunks: AtomicUsize::new(0),
        }
    }

    pub fn begin_run(&self) {
        self.run_id.fetch_add(1, Ordering::SeqCst);
        *self
            .started_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());

        for counter in [
            &self.elapsed_ns,
            &self.rows_processed,
            &self.chunks_started,
            &self.chunks_finished,
            &self.partials_merged,
            &self.throttle_wait_ns,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
        self.active_chunks.store(0, Ordering::SeqCst);
        self.max_active_chunks.store(0, Ordering::SeqCst);
    }

    pub fn end_run(&self, elapsed: Duration) {
        // Zero would read as "still running" in `snapshot`.
        self.elapsed_ns
            .store(saturating_nanos(elapsed).max(1), Ordering::SeqCst);
    }

    pub fn on_rows_processed(&self, n: usize) {
        self.rows_processed.fetch_add(n as u64, Ordering::SeqCst);
    }

    pub fn on_chunk_start(&self) {
        self.chunks_started.fetch_add(1, Ordering::SeqCst);
        let now = self.active_chunks.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_chunks.fetch_max(now, Ordering::SeqCst);
    }

    pub fn on_chunk_end(&self) {
        self.chunks_finished.fetch_add(1, Ordering::SeqCst);
        self.active_chunks.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn on_partial_merged(&self) {
        self.partials_merged.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on_throttle_wait(&self, d: Duration) {
        self.throttle_wait_ns
            .fetch_add(saturating_nanos(d), Ordering::SeqCst);
    }

    /// Counters as of now. While a run is in progress, `elapsed` is the time since it started.
    pub fn snapshot(&self) -> ExecutionMetricsSnapshot {
        let elapsed = match self.elapsed_ns.load(Ordering::SeqCst) {
            0 => self
                .started_at
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .map(|t| t.elapsed()),
            ns => Some(Duration::from_nanos(ns)),
        };

        ExecutionMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed,
            rows_processed: self.rows_processed.load(Ordering::SeqCst),
            chunks_started: self.chunks_started.load(Ordering::SeqCst),
            chunks_finished: self.chunks_finished.load(Ordering::SeqCst),
            partials_merged: self.partials_merged.load(Ordering::SeqCst),
            throttle_wait: Duration::from_nanos(self.throttle_wait_ns.load(Ordering::SeqCst)),
            max_active_chunks: self.max_active_chunks.load(Ordering::SeqCst),
        }
    }
}

impl Default for ExecutionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable snapshot of [`ExecutionMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionMetricsSnapshot {
    pub run_id: u64,
    /// `None` before the first run.
    pub elapsed: Option<Duration>,
    pub rows_processed: u64,
    pub chunks_started: u64,
    pub chunks_finished: u64,
    pub partials_merged: u64,
    pub throttle_wait: Duration,
    pub max_active_chunks: usize,
}

impl fmt::Display for ExecutionMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, rows_processed={}, chunks={}/{}, partials_merged={}, max_active_chunks={}, throttle_wait={:?}, elapsed={:?}",
            self.run_id,
            self.rows_processed,
            self.chunks_finished,
            self.chunks_started,
            self.partials_merged,
            self.max_active_chunks,
            self.throttle_wait,
            self.elapsed
        )
    }
}
