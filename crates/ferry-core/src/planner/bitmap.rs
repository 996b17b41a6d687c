//! Chunk completion bitmap.

/// One bit per chunk (LSB of byte 0 = chunk 0).
#[derive(Debug, Clone, Default)]
pub struct ChunkBitmap {
    bytes: Vec<u8>,
    chunk_count: usize,
}

impl ChunkBitmap {
    /// Empty bitmap with room for `chunk_count` bits.
    pub fn new(chunk_count: usize) -> Self {
        ChunkBitmap {
            bytes: vec![0u8; chunk_count.div_ceil(8)],
            chunk_count,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Marks chunk `index`. Returns true if the bit was not already set.
    /// Indices outside the plan are ignored and return false.
    pub fn set_completed(&mut self, index: usize) -> bool {
        if index >= self.chunk_count {
            return false;
        }
        let mask = 1u8 << (index % 8);
        let byte = &mut self.bytes[index / 8];
        let fresh = *byte & mask == 0;
        *byte |= mask;
        fresh
    }

    /// True if chunk `index` is marked.
    pub fn is_completed(&self, index: usize) -> bool {
        self.bytes
            .get(index / 8)
            .map(|&b| (b & (1 << (index % 8))) != 0)
            .unwrap_or(false)
    }

    /// Number of marked chunks.
    pub fn completed_count(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// True when every chunk in the plan is marked.
    pub fn all_completed(&self) -> bool {
        self.completed_count() == self.chunk_count
    }
}
