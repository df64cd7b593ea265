use serde::Serialize;
use tracing::info;

use crate::config::ReadOptions;
use crate::errors::ConfigError;
use crate::split::{BatchPlan, ParametersProvider, Range};

/// One read task of a partitioned scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadSplit {
    pub index: usize,
    pub range: Option<Range>,
    pub shards: Option<Vec<i32>>,
    /// WHERE fragment to append to the task's SELECT, if the scan is bounded.
    pub where_clause: Option<String>,
}

/// The planner turns read options and the shard topology into read splits.
/// It runs once on the coordinating side before tasks are distributed.
pub struct ReadPlanner {
    options: ReadOptions,
    shard_ids: Option<Vec<i32>>,
}

impl ReadPlanner {
    /// `shard_ids` overrides the ids carried by the options, if any.
    pub fn new(options: ReadOptions, shard_ids: Option<Vec<i32>>) -> Self {
        let shard_ids = shard_ids.or_else(|| options.shard_ids.clone());
        Self { options, shard_ids }
    }

    pub fn provider(&self) -> Result<ParametersProvider, ConfigError> {
        let mut builder = ParametersProvider::builder()
            .batch_num(self.options.partition_num.unwrap_or(1))
            .use_local(self.options.use_local);

        if let Some((lower, upper)) = self.options.bounds() {
            if self.partition_column().is_none() {
                return Err(ConfigError::MissingField {
                    field: "read.partition_column".to_string(),
                });
            }
            builder = builder.min_val(lower).max_val(upper);
        }
        if let Some(ids) = &self.shard_ids {
            builder = builder.shard_ids(ids.clone());
        }

        builder.build()
    }

    pub fn plan(&self) -> Result<Vec<ReadSplit>, ConfigError> {
        let provider = self.provider()?;
        info!(
            kind = ?provider.kind(),
            requested = ?self.options.partition_num,
            tasks = provider.plan().len(),
            "Built read plan"
        );
        Ok(self.splits(provider.plan()))
    }

    fn splits(&self, plan: &BatchPlan) -> Vec<ReadSplit> {
        let column = self.partition_column();
        plan.entries()
            .iter()
            .map(|entry| ReadSplit {
                index: entry.index,
                range: entry.range,
                shards: entry.shards.clone(),
                where_clause: column.and_then(|c| entry.where_clause(c)),
            })
            .collect()
    }

    fn partition_column(&self) -> Option<&str> {
        self.options
            .partition_column
            .as_deref()
            .filter(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranged(num: i32) -> ReadOptions {
        ReadOptions {
            use_local: false,
            partition_column: Some("id".to_string()),
            partition_num: Some(num),
            partition_lower_bound: Some(0),
            partition_upper_bound: Some(9),
            shard_ids: None,
        }
    }

    #[test]
    fn test_plan_renders_where_clauses() {
        let splits = ReadPlanner::new(ranged(3), None).plan().unwrap();

        let clauses: Vec<_> = splits.iter().map(|s| s.where_clause.clone()).collect();
        assert_eq!(
            clauses,
            vec![
                Some("`id` BETWEEN 0 AND 2".to_string()),
                Some("`id` BETWEEN 3 AND 5".to_string()),
                Some("`id` BETWEEN 6 AND 9".to_string()),
            ]
        );
        assert_eq!(
            splits.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_unpartitioned_read_is_single_task() {
        let splits = ReadPlanner::new(ReadOptions::default(), None)
            .plan()
            .unwrap();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].where_clause, None);
        assert_eq!(splits[0].shards, None);
    }

    #[test]
    fn test_shard_ids_override_options() {
        let mut options = ranged(2);
        options.use_local = true;
        options.shard_ids = Some(vec![9]);

        let splits = ReadPlanner::new(options, Some(vec![1, 2])).plan().unwrap();
        assert_eq!(splits.len(), 2);
        assert_eq!(splits[0].shards, Some(vec![1]));
        assert_eq!(splits[1].shards, Some(vec![2]));
        assert!(splits.iter().all(|s| s.where_clause.is_some()));
    }

    #[test]
    fn test_range_without_column_is_rejected() {
        let mut options = ranged(2);
        options.partition_column = None;
        assert!(matches!(
            ReadPlanner::new(options, None).plan(),
            Err(ConfigError::MissingField { .. })
        ));
    }
}
