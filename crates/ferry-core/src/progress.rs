//! Upload progress: accounted bytes and percent, fed by completed chunks.
//!
//! Only chunks the server acknowledged count; nothing is estimated from
//! partial transfers. The percent is held below 100 until [`ProgressAggregator::finish`]
//! runs after a successful finalize, so callers see 100 exactly once.

use std::sync::{Arc, Mutex};

use crate::planner::ChunkBitmap;

/// Receives percent updates (0..=100).
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Snapshot of upload progress for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    /// Bytes from accounted (succeeded) chunks only.
    pub bytes_accounted: u64,
    pub total_bytes: u64,
    pub chunks_done: usize,
    pub chunk_count: usize,
    pub percent: u8,
}

struct Inner {
    accounted: ChunkBitmap,
    bytes_accounted: u64,
    percent: u8,
    finished: bool,
}

/// Thread-safe accumulator turning chunk completions into a monotonic percent.
pub struct ProgressAggregator {
    total_bytes: u64,
    inner: Mutex<Inner>,
    callback: Option<ProgressCallback>,
}

/// `floor(done / total * 100)`, with an empty total counting as complete.
pub fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) as u128 * 100) / total as u128) as u8
}

impl ProgressAggregator {
    pub fn new(total_bytes: u64, chunk_count: usize, callback: Option<ProgressCallback>) -> Self {
        Self {
            total_bytes,
            inner: Mutex::new(Inner {
                accounted: ChunkBitmap::new(chunk_count),
                bytes_accounted: 0,
                percent: 0,
                finished: false,
            }),
            callback,
        }
    }

    /// Account chunk `index` of `len` bytes and return the current percent.
    ///
    /// Idempotent per index: a second call for the same index adds nothing and
    /// does not notify. The callback runs under the lock so concurrent callers
    /// observe percents in non-decreasing order.
    pub fn accumulate(&self, index: usize, len: u64) -> u8 {
        let mut inner = self.lock();
        if inner.finished || !inner.accounted.set_completed(index) {
            return inner.percent;
        }
        inner.bytes_accounted += len;
        // 100 is reserved for a successful finalize.
        let pct = percent_of(inner.bytes_accounted, self.total_bytes).min(99);
        inner.percent = inner.percent.max(pct);
        let pct = inner.percent;
        if let Some(cb) = &self.callback {
            cb(pct);
        }
        pct
    }

    /// Report 100. Only the first call notifies; later calls are no-ops.
    pub fn finish(&self) {
        let mut inner = self.lock();
        if inner.finished {
            return;
        }
        inner.finished = true;
        inner.percent = 100;
        if let Some(cb) = &self.callback {
            cb(100);
        }
    }

    pub fn snapshot(&self) -> ProgressState {
        let inner = self.lock();
        ProgressState {
            bytes_accounted: inner.bytes_accounted,
            total_bytes: self.total_bytes,
            chunks_done: inner.accounted.completed_count(),
            chunk_count: inner.accounted.chunk_count(),
            percent: inner.percent,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panicking callback must not wedge progress for the rest of the upload.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for ProgressAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressAggregator")
            .field("state", &self.snapshot())
            .finish()
    }
}
