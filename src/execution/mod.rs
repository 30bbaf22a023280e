//! Chunked parallel reductions over a [`DataSet`].
//!
//! This module sits "above" [`crate::processing`] and provides:
//!
//! - Parallel (chunked) Count/Sum/Min/Max/Average/MinMax on a dedicated rayon pool
//! - Resource limits / throttling (in-flight chunks)
//! - Real-time metrics + observer hooks for monitoring
//!
//! Each chunk folds its rows into a [`crate::processing::Accumulator`]; partials are merged in
//! chunk order, so results equal the sequential reducers (exactly for integer, decimal and time
//! types, up to float rounding otherwise).

mod observer;
mod semaphore;

use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::ThreadPool;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};

use crate::error::{DataToolsError, DataToolsResult};
use crate::processing::{Accumulator, AggregationRequest, MinMax, ReduceOp};
use crate::types::{DataSet, DataType, Value};

pub use observer::{
    ExecutionEvent, ExecutionMetrics, ExecutionMetricsSnapshot, ExecutionObserver, StdErrExecutionObserver,
};

use semaphore::Semaphore;

/// Configuration for the [`ExecutionEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionOptions {
    /// Number of worker threads used by the engine.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Number of rows per chunk.
    pub chunk_size: usize,
    /// Upper bound on concurrently folded chunks.
    ///
    /// This is an additional throttle on top of `num_threads`.
    pub max_in_flight_chunks: usize,
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        let n = available_parallelism();
        Self {
            num_threads: Some(n),
            chunk_size: 4_096,
            max_in_flight_chunks: n,
        }
    }
}

impl ExecutionOptions {
    fn validate(&self) -> DataToolsResult<()> {
        let invalid = |message: &str| {
            Err(DataToolsError::InvalidOptions {
                message: message.to_string(),
            })
        };
        if self.chunk_size == 0 {
            return invalid("chunk_size must be > 0");
        }
        if self.max_in_flight_chunks == 0 {
            return invalid("max_in_flight_chunks must be > 0");
        }
        if self.num_threads == Some(0) {
            return invalid("num_threads must be > 0 when set");
        }
        Ok(())
    }
}

/// Runs reductions over in-memory [`DataSet`]s on its own thread pool.
pub struct ExecutionEngine {
    pool: ThreadPool,
    opts: ExecutionOptions,
    observer: Option<Arc<dyn ExecutionObserver>>,
    metrics: Arc<ExecutionMetrics>,
}

impl ExecutionEngine {
    /// Create a new engine with the given options.
    ///
    /// Fails with [`DataToolsError::InvalidOptions`] if `chunk_size == 0`,
    /// `max_in_flight_chunks == 0`, `num_threads == Some(0)`, or the pool cannot be built.
    pub fn new(opts: ExecutionOptions) -> DataToolsResult<Self> {
        opts.validate()?;

        let n_threads = opts.num_threads.unwrap_or_else(available_parallelism);
        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build()
            .map_err(|e| DataToolsError::InvalidOptions {
                message: format!("failed to build thread pool: {e}"),
            })?;

        Ok(Self {
            pool,
            opts,
            observer: None,
            metrics: Arc::new(ExecutionMetrics::new()),
        })
    }

    /// Attach an observer for execution events (metrics/logging).
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time execution metrics.
    pub fn metrics(&self) -> Arc<ExecutionMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.opts
    }

    /// Reduce one field in parallel. Same contract as [`crate::processing::reduce()`].
    pub fn reduce_parallel(
        &self,
        dataset: &DataSet,
        request: &AggregationRequest,
        op: ReduceOp,
    ) -> DataToolsResult<Value> {
        self.run(dataset, request, op, |acc| {
            let result = acc.finish()?;
            Ok((
                result.clone(),
                ExecutionEvent::ReduceFinished { op, result },
            ))
        })
    }

    /// Min and Max of one field in parallel. Same contract as
    /// [`crate::processing::min_max_value`].
    pub fn min_max_parallel(
        &self,
        dataset: &DataSet,
        request: &AggregationRequest,
    ) -> DataToolsResult<MinMax<Value>> {
        self.run(dataset, request, ReduceOp::Min, |acc| {
            let bounds = acc.min_max()?;
            Ok((bounds.clone(), ExecutionEvent::MinMaxFinished { bounds }))
        })
    }

    fn run<T>(
        &self,
        dataset: &DataSet,
        request: &AggregationRequest,
        op: ReduceOp,
        finish: impl FnOnce(&Accumulator) -> DataToolsResult<(T, ExecutionEvent)>,
    ) -> DataToolsResult<T> {
        let start = Instant::now();
        self.metrics.begin_run();
        self.emit(ExecutionEvent::RunStarted);

        let outcome = self
            .accumulate(dataset, request, op)
            .and_then(|acc| finish(&acc));
        let out = match outcome {
            Ok((value, event)) => {
                self.emit(event);
                Ok(value)
            }
            Err(e) => {
                self.emit(ExecutionEvent::ReduceFailed {
                    message: e.to_string(),
                });
                Err(e)
            }
        };

        self.metrics.end_run(start.elapsed());
        self.emit(ExecutionEvent::RunFinished {
            elapsed: start.elapsed(),
            metrics: self.metrics.snapshot(),
        });
        out
    }

    fn accumulate(
        &self,
        dataset: &DataSet,
        request: &AggregationRequest,
        op: ReduceOp,
    ) -> DataToolsResult<Accumulator> {
        let field = request.field.resolve(dataset)?.into_owned();
        let idx = dataset.schema.require(&field)?;
        let data_type = dataset.schema.fields.get(idx).map(|f| f.data_type);
        let skip_nulls = request.skip_nulls;
        // Rejects unsupported type/op pairs before any chunk is scheduled.
        let mut total = Accumulator::new(op, data_type, skip_nulls)?;

        self.emit(ExecutionEvent::ReduceStarted { field, op });

        let sem = Semaphore::new(self.opts.max_in_flight_chunks);
        let ranges = chunk_ranges(dataset.row_count(), self.opts.chunk_size);

        let partials: Vec<DataToolsResult<Accumulator>> = self.pool.install(|| {
            ranges
                .into_par_iter()
                .map(|range| {
                    let waited = sem.acquire();
                    if waited > Duration::ZERO {
                        self.metrics.on_throttle_wait(waited);
                        self.emit(ExecutionEvent::ThrottleWaited { duration: waited });
                    }

                    let row_count = range.len();
                    self.metrics.on_chunk_start();
                    self.emit(ExecutionEvent::ChunkStarted {
                        start_row: range.start,
                        row_count,
                    });

                    let partial = fold_chunk(dataset, range, idx, op, data_type, skip_nulls);

                    self.metrics.on_rows_processed(row_count);
                    self.emit(ExecutionEvent::ChunkFinished { row_count });
                    self.metrics.on_chunk_end();
                    sem.release();
                    partial
                })
                .collect()
        });

        for partial in partials {
            total.merge(partial?)?;
            self.metrics.on_partial_merged();
        }
        Ok(total)
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

fn fold_chunk(
    dataset: &DataSet,
    range: Range<usize>,
    idx: usize,
    op: ReduceOp,
    data_type: Option<DataType>,
    skip_nulls: bool,
) -> DataToolsResult<Accumulator> {
    let mut acc = Accumulator::new(op, data_type, skip_nulls)?;
    acc.extend(
        dataset.rows[range]
            .iter()
            .map(|row| row.get(idx).unwrap_or(&Value::Null)),
    )?;
    Ok(acc)
}

fn chunk_ranges(row_count: usize, chunk_size: usize) -> Vec<Range<usize>> {
    (0..row_count)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(row_count))
        .collect()
}
