pub mod config;
pub mod errors;
pub mod planner;
pub mod sink;
pub mod split;
pub mod telemetry;

pub use config::ConnectorConfig;
pub use errors::{ConnectorError, Result};
pub use planner::{ReadPlanner, ReadSplit};
pub use sink::BatchBufferedSink;
pub use split::{BatchPlan, ParametersProvider};
