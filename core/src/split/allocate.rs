//! Remainder-balanced allocation shared by every partitioning variant.

/// Sizes of `length` buckets: the first `min_batch_num` hold `min_batch_size`,
/// the trailing ones hold `min_batch_size + 1`.
///
/// Callers guarantee `min_batch_num <= length`.
pub fn allocate(min_batch_size: u64, min_batch_num: usize, length: usize) -> Vec<u64> {
    (0..length)
        .map(|i| {
            if i < min_batch_num {
                min_batch_size
            } else {
                min_batch_size + 1
            }
        })
        .collect()
}

/// Contiguous copy of `count` ids starting at `start`.
///
/// Callers guarantee `start + count <= source.len()`.
pub fn subset(start: usize, count: usize, source: &[i32]) -> Vec<i32> {
    source[start..start + count].to_vec()
}

/// Spreads `total` over `buckets` so that no two buckets differ by more than one.
pub fn balance(total: u64, buckets: usize) -> Vec<u64> {
    if buckets == 0 {
        return Vec::new();
    }
    let n = buckets as u64;
    allocate(total / n, (n - total % n) as usize, buckets)
}
