use tracing::debug;

use super::allocate::{balance, subset};
use super::{BatchPlan, Range, divide_range};
use crate::errors::ConfigError;

/// How the parallel read is scoped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    /// A single unfiltered read task.
    NonParameters,
    /// Value range split into sub-ranges against the distributed table.
    BatchBetween { range: Range },
    /// Value range split into sub-ranges, each scoped to shard-local tables.
    ShardBetween { range: Range, shard_ids: Vec<i32> },
    /// Shard ids grouped into read tasks, no value filter.
    ShardTable { shard_ids: Vec<i32> },
}

impl ProviderKind {
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ProviderKind::NonParameters => Ok(()),
            ProviderKind::BatchBetween { range } => range.validate(),
            ProviderKind::ShardBetween { range, shard_ids } => {
                range.validate()?;
                non_empty(shard_ids)
            }
            ProviderKind::ShardTable { shard_ids } => non_empty(shard_ids),
        }
    }
}

fn non_empty(shard_ids: &[i32]) -> Result<(), ConfigError> {
    if shard_ids.is_empty() {
        return Err(ConfigError::EmptyShardIds);
    }
    Ok(())
}

/// Computes the parameter tuples of a partitioned read.
///
/// Constructed once on the coordinating side; the resulting [`BatchPlan`] is
/// immutable and can be shared read-only with every read task.
#[derive(Debug, Clone)]
pub struct ParametersProvider {
    kind: ProviderKind,
    batch_num: usize,
    plan: BatchPlan,
}

impl ParametersProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            batch_num: 1,
            plan: BatchPlan::default(),
        }
    }

    pub fn builder() -> ParametersProviderBuilder {
        ParametersProviderBuilder::default()
    }

    /// Sets the desired parallelism, clamped to what the inputs can be split into.
    pub fn with_batch_num(mut self, batch_num: i32) -> Result<Self, ConfigError> {
        if batch_num <= 0 {
            return Err(ConfigError::InvalidBatchNum {
                batch_num: Some(batch_num),
            });
        }
        self.kind.validate()?;
        let requested = batch_num as usize;
        self.batch_num = match &self.kind {
            ProviderKind::NonParameters => 1,
            ProviderKind::BatchBetween { range } => {
                (requested as u128).min(range.span()) as usize
            }
            ProviderKind::ShardTable { shard_ids } => requested.min(shard_ids.len()),
            ProviderKind::ShardBetween { .. } => requested,
        };
        Ok(self)
    }

    pub fn calculate(mut self) -> Self {
        let mut plan = BatchPlan::default();
        match &self.kind {
            ProviderKind::NonParameters => plan.push(None, None),
            ProviderKind::BatchBetween { range } => {
                for sub in divide_range(*range, self.batch_num) {
                    plan.push(Some(sub), None);
                }
            }
            ProviderKind::ShardBetween { range, shard_ids } => {
                shard_between(&mut plan, *range, shard_ids, self.batch_num);
            }
            ProviderKind::ShardTable { shard_ids } => {
                let mut start = 0;
                for size in balance(shard_ids.len() as u64, self.batch_num) {
                    let size = size as usize;
                    plan.push(None, Some(subset(start, size, shard_ids)));
                    start += size;
                }
            }
        }

        debug!(
            kind = ?self.kind,
            batch_num = self.batch_num,
            tuples = plan.len(),
            "Calculated read parameters"
        );
        self.plan = plan;
        self
    }

    pub fn kind(&self) -> &ProviderKind {
        &self.kind
    }

    pub fn batch_num(&self) -> usize {
        self.batch_num
    }

    pub fn plan(&self) -> &BatchPlan {
        &self.plan
    }

    pub fn into_plan(self) -> BatchPlan {
        self.plan
    }

    pub fn parameter_values(&self) -> Vec<Option<Range>> {
        self.plan.parameter_values()
    }

    pub fn shard_id_values(&self) -> Vec<Option<Vec<i32>>> {
        self.plan.shard_id_values()
    }

    /// Prepared-statement clause the parameter values bind into.
    pub fn parameter_clause(&self, column: &str) -> Option<String> {
        match self.kind {
            ProviderKind::BatchBetween { .. } | ProviderKind::ShardBetween { .. } => {
                Some(format!("`{}` BETWEEN ? AND ?", column))
            }
            ProviderKind::NonParameters | ProviderKind::ShardTable { .. } => None,
        }
    }
}

fn shard_between(plan: &mut BatchPlan, range: Range, shard_ids: &[i32], batch_num: usize) {
    let shard_num = shard_ids.len();
    if batch_num >= shard_num {
        // every shard gets at least one sub-range of its own
        for (shard, count) in shard_ids.iter().zip(balance(batch_num as u64, shard_num)) {
            for sub in divide_range(range, count as usize) {
                plan.push(Some(sub), Some(vec![*shard]));
            }
        }
    } else {
        let mut start = 0;
        for size in balance(shard_num as u64, batch_num) {
            let size = size as usize;
            plan.push(Some(range), Some(subset(start, size, shard_ids)));
            start += size;
        }
    }
}

/// Picks the provider variant from which inputs are present.
#[derive(Debug, Clone, Default)]
pub struct ParametersProviderBuilder {
    min_val: Option<i64>,
    max_val: Option<i64>,
    batch_num: Option<i32>,
    shard_ids: Option<Vec<i32>>,
    use_local: bool,
}

impl ParametersProviderBuilder {
    pub fn min_val(mut self, min_val: i64) -> Self {
        self.min_val = Some(min_val);
        self
    }

    pub fn max_val(mut self, max_val: i64) -> Self {
        self.max_val = Some(max_val);
        self
    }

    pub fn batch_num(mut self, batch_num: i32) -> Self {
        self.batch_num = Some(batch_num);
        self
    }

    pub fn shard_ids(mut self, shard_ids: Vec<i32>) -> Self {
        self.shard_ids = Some(shard_ids);
        self
    }

    pub fn use_local(mut self, use_local: bool) -> Self {
        self.use_local = use_local;
        self
    }

    pub fn build(self) -> Result<ParametersProvider, ConfigError> {
        let batch_num = match self.batch_num {
            Some(n) if n > 0 => n,
            other => return Err(ConfigError::InvalidBatchNum { batch_num: other }),
        };

        let range = match self.min_val.zip(self.max_val) {
            Some((lower, upper)) if lower > upper => {
                return Err(ConfigError::InvalidRange { lower, upper });
            }
            Some((lower, upper)) => Some(Range::new(lower, upper)),
            None => None,
        };

        let shard_ids = match self.shard_ids {
            Some(ids) if self.use_local => {
                if ids.is_empty() {
                    return Err(ConfigError::EmptyShardIds);
                }
                Some(ids)
            }
            _ => None,
        };

        let kind = match (range, shard_ids) {
            (None, None) => ProviderKind::NonParameters,
            (None, Some(shard_ids)) => ProviderKind::ShardTable { shard_ids },
            (Some(range), None) => ProviderKind::BatchBetween { range },
            (Some(range), Some(shard_ids)) => ProviderKind::ShardBetween { range, shard_ids },
        };

        Ok(ParametersProvider::new(kind)
            .with_batch_num(batch_num)?
            .calculate())
    }
}
