//! Chunk planning.
//!
//! Splits a file into fixed-size chunks (the last one may be shorter) and
//! provides a completion bitmap for tracking which chunks were accounted.

mod bitmap;
mod range;

pub use bitmap::ChunkBitmap;
pub use range::{plan_chunks, ChunkPlan, ChunkRange, ChunkStatus, ChunkTask, PlanIter};
