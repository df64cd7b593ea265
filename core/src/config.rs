use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

pub const CONFIG_ENV_VAR: &str = "CONNECTOR_CONFIG";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectorConfig {
    pub version: u32,
    pub connection: ConnectionOptions,
    #[serde(default)]
    pub read: ReadOptions,
    #[serde(default)]
    pub write: WriteOptions,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionOptions {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database_name: String,
    pub table_name: String,
}

/// Options of the partitioned scan.
///
/// `use_local` reads the shard-local tables directly instead of the
/// distributed table, scoping each read task to one or more shard ids.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReadOptions {
    #[serde(default)]
    pub use_local: bool,
    pub partition_column: Option<String>,
    pub partition_num: Option<i32>,
    pub partition_lower_bound: Option<i64>,
    pub partition_upper_bound: Option<i64>,
    /// Shard topology of the target table when it is known up front.
    pub shard_ids: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Number of buffered records that triggers an inline flush.
    pub batch_size: usize,
    /// Cadence of the background flush.
    pub flush_interval_ms: u64,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            flush_interval_ms: 1000,
        }
    }
}

pub async fn load_config(config_path: Option<&str>) -> anyhow::Result<ConnectorConfig> {
    match config_path {
        Some(path) => ConnectorConfig::from_file(path),
        None => ConnectorConfig::from_env(),
    }
}

impl ConnectorConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_string(),
            error: Box::new(e),
        })?;
        let config: ConnectorConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let config_str = std::env::var(CONFIG_ENV_VAR)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", CONFIG_ENV_VAR))?;
        let config: ConnectorConfig = serde_yaml::from_str(&config_str)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.url.is_empty() {
            return Err(invalid("Connection url cannot be empty"));
        }
        if self.connection.table_name.is_empty() {
            return Err(invalid("Table name cannot be empty"));
        }
        self.read.validate()?;
        self.write.validate()
    }
}

impl ReadOptions {
    /// Both bounds present means the scan is split by value.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        self.partition_lower_bound.zip(self.partition_upper_bound)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(num) = self.partition_num {
            if num <= 0 {
                return Err(ConfigError::InvalidBatchNum {
                    batch_num: Some(num),
                });
            }
        }
        if let Some((lower, upper)) = self.bounds() {
            if lower > upper {
                return Err(ConfigError::InvalidRange { lower, upper });
            }
            if self.partition_column.as_deref().is_none_or(str::is_empty) {
                return Err(ConfigError::MissingField {
                    field: "read.partition_column".to_string(),
                });
            }
        }
        if self.use_local && self.shard_ids.as_ref().is_some_and(Vec::is_empty) {
            return Err(ConfigError::EmptyShardIds);
        }
        Ok(())
    }
}

impl WriteOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(invalid("write.batch_size must be greater than zero"));
        }
        if self.flush_interval_ms == 0 {
            return Err(invalid("write.flush_interval_ms must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationFailed {
        reason: message.to_string(),
    }
}
