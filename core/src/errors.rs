use std::sync::Arc;
use thiserror::Error;

/// Error type produced by the store collaborators (executor, connections).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A collaborator error that can be handed out more than once.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Batch number must be positive, got {batch_num:?}")]
    InvalidBatchNum { batch_num: Option<i32> },

    #[error("Lower bound {lower} is greater than upper bound {upper}")]
    InvalidRange { lower: i64, upper: i64 },

    #[error("Shard-local reads need at least one shard id")]
    EmptyShardIds,

    #[error("Failed to load configuration from {path}: {error}")]
    LoadFailed {
        path: String,
        #[source]
        error: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Unable to establish connection with the store")]
    Connection {
        #[source]
        source: BoxError,
    },

    #[error("Writing record to the batch failed")]
    Serialization {
        #[source]
        source: BoxError,
    },

    #[error("Flushing batch to the store failed")]
    Flush {
        #[source]
        source: SharedError,
    },

    #[error("Invalid sink options: {0}")]
    Config(#[from] ConfigError),

    #[error("Sink is not open")]
    NotOpen,

    #[error("Sink is already open")]
    AlreadyOpen,
}

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("JSON serialization failed: {reason}")]
    Json { reason: String },

    #[error("YAML serialization failed: {reason}")]
    Yaml { reason: String },
}

pub type Result<T> = std::result::Result<T, ConnectorError>;

impl From<serde_json::Error> for ConnectorError {
    fn from(err: serde_json::Error) -> Self {
        ConnectorError::Serialization(SerializationError::Json {
            reason: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for ConnectorError {
    fn from(err: serde_yaml::Error) -> Self {
        ConnectorError::Serialization(SerializationError::Yaml {
            reason: err.to_string(),
        })
    }
}

impl SinkError {
    pub(crate) fn flush(source: BoxError) -> Self {
        SinkError::Flush {
            source: Arc::from(source),
        }
    }
}

impl ConnectorError {
    /// Whether a caller may tear the task down and try again.
    /// Nothing inside this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            ConnectorError::Config(_) => false,
            ConnectorError::Serialization(_) => false,
            ConnectorError::Sink(SinkError::Serialization { .. }) => false,
            ConnectorError::Sink(
                SinkError::Config(_) | SinkError::NotOpen | SinkError::AlreadyOpen,
            ) => false,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_types() {
        let sink_error = SinkError::flush("connection reset".into());
        let error = ConnectorError::Sink(sink_error);
        assert!(error.is_retryable());
        assert_eq!(
            error.source().map(|e| e.to_string()),
            Some("Flushing batch to the store failed".to_string())
        );

        let config_error = ConfigError::InvalidRange { lower: 5, upper: 1 };
        let error = ConnectorError::Config(config_error);
        assert!(!error.is_retryable());
        assert!(error.to_string().contains("Lower bound 5"));

        let error = ConnectorError::Sink(SinkError::Config(ConfigError::EmptyShardIds));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_flush_error_keeps_cause() {
        let error = SinkError::flush("disk full".into());
        let cause = error.source().map(|e| e.to_string());
        assert_eq!(cause.as_deref(), Some("disk full"));
    }
}
