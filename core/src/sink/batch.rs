use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::{ConnectionProvider, Executor, ExecutorFactory, TableMetadata};
use crate::config::WriteOptions;
use crate::errors::{SharedError, SinkError};
use crate::telemetry::SinkMetrics;

/// State shared by the writer path and the background flush task.
struct WriteBatch<E> {
    executor: Option<E>,
    batch_count: usize,
    /// Failure captured by the background flush, re-raised by every write.
    flush_error: Option<SharedError>,
    metrics: SinkMetrics,
}

impl<E: Executor> WriteBatch<E> {
    fn new(executor: Option<E>) -> Self {
        Self {
            executor,
            batch_count: 0,
            flush_error: None,
            metrics: SinkMetrics::default(),
        }
    }

    fn check_flush_error(&self) -> Result<(), SinkError> {
        match &self.flush_error {
            Some(source) => Err(SinkError::Flush {
                source: source.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        if self.batch_count == 0 {
            return Ok(());
        }
        let executor = self.executor.as_mut().ok_or(SinkError::NotOpen)?;

        match executor.flush().await {
            Ok(()) => {
                debug!(records = self.batch_count, "Flushed batch");
                self.metrics.record_flush(self.batch_count);
                self.batch_count = 0;
                Ok(())
            }
            Err(e) => {
                self.metrics.failed_flushes += 1;
                Err(SinkError::flush(e))
            }
        }
    }
}

struct FlushTimer {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl FlushTimer {
    fn spawn<E: Executor>(state: Arc<Mutex<WriteBatch<E>>>, interval: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_rx.changed() => break,
                }

                let mut batch = state.lock().await;
                if let Err(err) = batch.flush().await {
                    let source: SharedError = match err {
                        SinkError::Flush { source } => source,
                        other => Arc::new(other),
                    };
                    error!(error = %source, "Background flush failed, sink is poisoned until closed");
                    batch.flush_error = Some(source);
                    break;
                }
            }
        });

        Self { shutdown, handle }
    }

    /// Stops the timer, waiting for an in-progress flush to complete.
    async fn stop(self) {
        // the task may already have exited after a failed flush
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Flush timer terminated abnormally");
        }
    }
}

/// Buffers records into an executor batch and flushes it when `batch_size`
/// records are pending or when the flush interval elapses.
///
/// A failure of the background flush poisons the sink: every later
/// [`write`](Self::write) fails with that same error until the sink is closed.
pub struct BatchBufferedSink<F: ExecutorFactory, C: ConnectionProvider> {
    factory: F,
    connections: C,
    table: TableMetadata,
    options: WriteOptions,
    state: Arc<Mutex<WriteBatch<F::Executor>>>,
    timer: Option<FlushTimer>,
}

impl<F: ExecutorFactory, C: ConnectionProvider> BatchBufferedSink<F, C> {
    pub fn new(factory: F, connections: C, table: TableMetadata, options: WriteOptions) -> Self {
        Self {
            factory,
            connections,
            table,
            options,
            state: Arc::new(Mutex::new(WriteBatch::new(None))),
            timer: None,
        }
    }

    pub async fn open(&mut self, task_index: usize, task_count: usize) -> Result<(), SinkError> {
        if self.timer.is_some() || self.state.lock().await.executor.is_some() {
            return Err(SinkError::AlreadyOpen);
        }
        self.options.validate()?;

        let mut executor = self
            .factory
            .create_executor(&self.table, &self.options)
            .map_err(|source| SinkError::Connection { source })?;
        if let Err(source) = executor.prepare(&self.connections).await {
            executor.close();
            return Err(SinkError::Connection { source });
        }

        *self.state.lock().await = WriteBatch::new(Some(executor));
        self.timer = Some(FlushTimer::spawn(
            self.state.clone(),
            Duration::from_millis(self.options.flush_interval_ms),
        ));

        info!(
            task_index,
            task_count,
            table = %self.table.table_name,
            batch_size = self.options.batch_size,
            flush_interval_ms = self.options.flush_interval_ms,
            "Opened batch sink"
        );
        Ok(())
    }

    pub async fn write(&self, record: <F::Executor as Executor>::Record) -> Result<(), SinkError> {
        let mut batch = self.state.lock().await;
        batch.check_flush_error()?;

        let executor = batch.executor.as_mut().ok_or(SinkError::NotOpen)?;
        executor
            .add_to_batch(record)
            .map_err(|source| SinkError::Serialization { source })?;
        batch.batch_count += 1;
        batch.metrics.records_written += 1;

        if batch.batch_count >= self.options.batch_size {
            batch.flush().await?;
        }
        Ok(())
    }

    pub async fn flush(&self) -> Result<(), SinkError> {
        self.state.lock().await.flush().await
    }

    /// Stops the timer, flushes what is left and releases the executor and
    /// connections. Release happens even if the final flush fails.
    pub async fn close(&mut self) -> Result<(), SinkError> {
        if let Some(timer) = self.timer.take() {
            timer.stop().await;
        }

        let mut batch = self.state.lock().await;
        let result = if batch.executor.is_some() {
            batch.flush().await
        } else {
            Ok(())
        };
        if let Err(e) = &result {
            warn!(error = %e, records = batch.batch_count, "Final flush on close failed");
        }

        if let Some(mut executor) = batch.executor.take() {
            executor.close();
        }
        batch.flush_error = None;
        self.connections.close_all();

        info!(
            table = %self.table.table_name,
            records_written = batch.metrics.records_written,
            flushes = batch.metrics.flushes,
            "Closed batch sink"
        );
        result
    }

    /// Number of records buffered since the last successful flush.
    pub async fn pending(&self) -> usize {
        self.state.lock().await.batch_count
    }

    pub async fn metrics(&self) -> SinkMetrics {
        self.state.lock().await.metrics.clone()
    }
}
