pub mod allocate;
mod provider;

pub use allocate::{allocate, balance, subset};
pub use provider::{ParametersProvider, ParametersProviderBuilder, ProviderKind};

use serde::Serialize;

use crate::errors::ConfigError;

/// Inclusive value range `[lower, upper]` of the partition column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Range {
    pub lower: i64,
    pub upper: i64,
}

impl Range {
    pub fn new(lower: i64, upper: i64) -> Self {
        Self { lower, upper }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lower > self.upper {
            return Err(ConfigError::InvalidRange {
                lower: self.lower,
                upper: self.upper,
            });
        }
        Ok(())
    }

    /// Number of distinct values covered. Wider than `u64` only for the full `i64` domain.
    pub fn span(&self) -> u128 {
        (self.upper as i128 - self.lower as i128 + 1) as u128
    }
}

/// One parameter tuple, driving exactly one read task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub index: usize,
    pub range: Option<Range>,
    pub shards: Option<Vec<i32>>,
}

impl PlanEntry {
    /// WHERE fragment bounding this task's scan, if the entry carries a range.
    pub fn where_clause(&self, column: &str) -> Option<String> {
        self.range
            .map(|r| format!("`{}` BETWEEN {} AND {}", column, r.lower, r.upper))
    }
}

/// Ordered parameter tuples produced by one provider invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchPlan {
    entries: Vec<PlanEntry>,
}

impl BatchPlan {
    pub(crate) fn push(&mut self, range: Option<Range>, shards: Option<Vec<i32>>) {
        let index = self.entries.len();
        self.entries.push(PlanEntry {
            index,
            range,
            shards,
        });
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Range bound into each read task, index-aligned with [`Self::shard_id_values`].
    pub fn parameter_values(&self) -> Vec<Option<Range>> {
        self.entries.iter().map(|e| e.range).collect()
    }

    /// Shard ids each read task is scoped to.
    pub fn shard_id_values(&self) -> Vec<Option<Vec<i32>>> {
        self.entries.iter().map(|e| e.shards.clone()).collect()
    }
}

/// Splits `range` into at most `batch_num` contiguous ascending sub-ranges.
/// The count is clamped to the span; larger pieces go to the tail.
pub(crate) fn divide_range(range: Range, batch_num: usize) -> Vec<Range> {
    let span = range.span();
    let n = (batch_num as u128).min(span) as usize;
    if n <= 1 {
        return vec![range];
    }

    // n >= 2 keeps span / n inside u64 even for the full i64 domain
    let sizes = balance_span(span, n);
    let mut lower = range.lower as i128;
    sizes
        .into_iter()
        .map(|size| {
            let upper = lower + size as i128 - 1;
            let sub = Range::new(lower as i64, upper as i64);
            lower = upper + 1;
            sub
        })
        .collect()
}

fn balance_span(span: u128, buckets: usize) -> Vec<u64> {
    let n = buckets as u128;
    allocate((span / n) as u64, (n - span % n) as usize, buckets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers(range: Range, parts: &[Range]) {
        assert_eq!(parts.first().map(|r| r.lower), Some(range.lower));
        assert_eq!(parts.last().map(|r| r.upper), Some(range.upper));
        for w in parts.windows(2) {
            assert_eq!(w[0].upper + 1, w[1].lower, "gap or overlap in {:?}", parts);
        }
    }

    #[test]
    fn test_divide_range_remainder_on_tail() {
        let parts = divide_range(Range::new(0, 9), 3);
        assert_eq!(
            parts,
            vec![Range::new(0, 2), Range::new(3, 5), Range::new(6, 9)]
        );
    }

    #[test]
    fn test_divide_range_clamps_to_span() {
        let parts = divide_range(Range::new(5, 7), 10);
        assert_eq!(
            parts,
            vec![Range::new(5, 5), Range::new(6, 6), Range::new(7, 7)]
        );

        let single = divide_range(Range::new(4, 4), 3);
        assert_eq!(single, vec![Range::new(4, 4)]);
    }

    #[test]
    fn test_divide_range_negative_and_extreme_bounds() {
        let range = Range::new(-10, 10);
        let parts = divide_range(range, 4);
        assert_eq!(parts.len(), 4);
        assert_covers(range, &parts);

        let full = Range::new(i64::MIN, i64::MAX);
        let parts = divide_range(full, 3);
        assert_eq!(parts.len(), 3);
        assert_covers(full, &parts);

        assert_eq!(divide_range(full, 1), vec![full]);
    }

    #[test]
    fn test_where_clause() {
        let mut plan = BatchPlan::default();
        plan.push(Some(Range::new(3, 5)), Some(vec![2]));
        plan.push(None, None);

        let entries = plan.entries();
        assert_eq!(
            entries[0].where_clause("id").as_deref(),
            Some("`id` BETWEEN 3 AND 5")
        );
        assert_eq!(entries[1].where_clause("id"), None);
        assert_eq!(entries[1].index, 1);
        assert_eq!(plan.shard_id_values(), vec![Some(vec![2]), None]);
    }
}
