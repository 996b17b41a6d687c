//! Chunk ranges and the lazily-evaluated chunk plan.

use crate::error::UploadError;

/// A chunk's byte range [start, end) (half-open).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    /// Start offset (inclusive).
    pub start: u64,
    /// End offset (exclusive).
    pub end: u64,
}

impl ChunkRange {
    /// Length of this chunk in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Transfer state of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkStatus {
    #[default]
    Pending,
    InFlight,
    Succeeded,
    Failed,
}

/// One unit of upload work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkTask {
    /// Zero-based position in the plan.
    pub index: usize,
    pub range: ChunkRange,
    pub status: ChunkStatus,
    /// Number of transport attempts made (diagnostics only).
    pub attempt: u32,
}

/// Deterministic chunk plan for one file. Tasks are computed on demand;
/// the plan can be iterated any number of times and yields the same tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    file_size: u64,
    chunk_size: u64,
}

/// Builds the chunk plan for `file_size` bytes split into `chunk_size` pieces.
///
/// Fails with `InvalidInput` when either value is zero.
pub fn plan_chunks(file_size: u64, chunk_size: u64) -> Result<ChunkPlan, UploadError> {
    if file_size == 0 {
        return Err(UploadError::InvalidInput("file size must be > 0".into()));
    }
    if chunk_size == 0 {
        return Err(UploadError::InvalidInput("chunk size must be > 0".into()));
    }
    Ok(ChunkPlan {
        file_size,
        chunk_size,
    })
}

impl ChunkPlan {
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of chunks: `ceil(file_size / chunk_size)`.
    pub fn len(&self) -> usize {
        self.file_size.div_ceil(self.chunk_size) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Range of the chunk at `index`, or `None` past the end of the plan.
    pub fn range(&self, index: usize) -> Option<ChunkRange> {
        let start = (index as u64).checked_mul(self.chunk_size)?;
        if start >= self.file_size {
            return None;
        }
        let end = start.saturating_add(self.chunk_size).min(self.file_size);
        Some(ChunkRange { start, end })
    }

    /// Lazily yields the plan's tasks in index order, all `Pending`.
    pub fn iter(&self) -> PlanIter {
        PlanIter {
            plan: *self,
            next: 0,
        }
    }

    /// Materializes every task.
    pub fn tasks(&self) -> Vec<ChunkTask> {
        self.iter().collect()
    }
}

impl IntoIterator for &ChunkPlan {
    type Item = ChunkTask;
    type IntoIter = PlanIter;

    fn into_iter(self) -> PlanIter {
        self.iter()
    }
}

/// Iterator over a [`ChunkPlan`].
#[derive(Debug, Clone)]
pub struct PlanIter {
    plan: ChunkPlan,
    next: usize,
}

impl Iterator for PlanIter {
    type Item = ChunkTask;

    fn next(&mut self) -> Option<ChunkTask> {
        let range = self.plan.range(self.next)?;
        let task = ChunkTask {
            index: self.next,
            range,
            status: ChunkStatus::Pending,
            attempt: 0,
        };
        self.next += 1;
        Some(task)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.plan.len().saturating_sub(self.next);
        (left, Some(left))
    }
}

impl ExactSizeIterator for PlanIter {}
