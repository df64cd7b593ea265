use anyhow::{Context, Result};
use connector_core::config::load_config;
use connector_core::errors::ConfigError;
use connector_core::planner::ReadPlanner;
use connector_core::telemetry::init_tracing;
use tracing::{error, info};

/// Prints the read plan a partitioned scan of the configured table would run.
///
/// What it does at a high-level:
///     Load config from the path given as first argument, or from
///     `CONNECTOR_CONFIG` when no path is given.
///     Validate it and build the parameter tuples of the read.
///     Print one JSON object per read task to stdout.
#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let path = std::env::args().nth(1);
    let config = load_config(path.as_deref())
        .await
        .context("Failed to load connector configuration")?;

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    let planner = ReadPlanner::new(config.read.clone(), None);
    let splits = match planner.plan() {
        Ok(splits) => splits,
        Err(e @ ConfigError::InvalidBatchNum { .. }) | Err(e @ ConfigError::InvalidRange { .. }) => {
            error!("Cannot partition the read: {}", e);
            return Err(e.into());
        }
        Err(e) => return Err(e).context("Failed to build read plan"),
    };

    info!(
        "Planned {} read task(s) for {}.{}",
        splits.len(),
        config.connection.database_name,
        config.connection.table_name
    );
    for split in &splits {
        println!("{}", serde_json::to_string(split)?);
    }
    Ok(())
}
