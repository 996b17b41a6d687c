//! Batch boundaries for the barrier scheduler.

use std::ops::Range;

/// Split `total` chunk indices into consecutive batches of at most `limit`.
/// Returns no batches when `limit` is 0.
pub fn batch_ranges(total: usize, limit: usize) -> Vec<Range<usize>> {
    if limit == 0 {
        return Vec::new();
    }
    (0..total)
        .step_by(limit)
        .map(|start| start..(start + limit).min(total))
        .collect()
}
