use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "connector_core=info,split_planner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Counters kept by a batch sink for the lifetime of one open/close cycle.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SinkMetrics {
    pub records_written: usize,
    pub records_flushed: usize,
    pub flushes: usize,
    pub failed_flushes: usize,
    pub last_flush_at: Option<DateTime<Utc>>,
}

impl SinkMetrics {
    pub(crate) fn record_flush(&mut self, records: usize) {
        self.flushes += 1;
        self.records_flushed += records;
        self.last_flush_at = Some(Utc::now());
    }

    pub fn avg_batch_size(&self) -> f64 {
        if self.flushes == 0 {
            0.0
        } else {
            self.records_flushed as f64 / self.flushes as f64
        }
    }
}
