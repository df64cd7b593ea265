mod batch;

pub use batch::BatchBufferedSink;

use serde::{Deserialize, Serialize};

use crate::config::WriteOptions;
use crate::errors::BoxError;

/// Column layout of the table a sink writes into.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TableMetadata {
    pub database_name: String,
    pub table_name: String,
    pub field_names: Vec<String>,
    pub key_fields: Vec<String>,
    pub partition_fields: Vec<String>,
    /// Store type name of each field, index-aligned with `field_names`.
    pub field_types: Vec<String>,
}

/// Owns the live sessions against the store.
pub trait ConnectionProvider: Send + Sync + 'static {
    /// Releases every open connection. Best-effort, never fails.
    fn close_all(&self);
}

/// Serializes records into an in-flight batch and ships it to the store.
///
/// An executor is owned by exactly one sink and is only ever driven under
/// that sink's lock, so implementations need no synchronization of their own.
pub trait Executor: Send + 'static {
    type Record: Send;

    /// Prepares statements against a connection of `connections`.
    fn prepare<C: ConnectionProvider>(
        &mut self,
        connections: &C,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Appends one record to the in-flight batch.
    fn add_to_batch(&mut self, record: Self::Record) -> Result<(), BoxError>;

    /// Sends the in-flight batch to the store and clears it on success.
    fn flush(&mut self) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Releases prepared statements. Best-effort, never fails.
    fn close(&mut self);
}

/// Builds executors for a sink when it is opened.
pub trait ExecutorFactory: Send + Sync + 'static {
    type Executor: Executor;

    fn create_executor(
        &self,
        table: &TableMetadata,
        options: &WriteOptions,
    ) -> Result<Self::Executor, BoxError>;
}
