//! `ferry plan <path>` – print chunk ranges and batch boundaries.

use std::path::Path;

use anyhow::{Context, Result};
use ferry_core::config::FerryConfig;
use ferry_core::planner::plan_chunks;
use ferry_core::scheduler::batch_ranges;

pub fn run_plan(
    cfg: &FerryConfig,
    path: &Path,
    chunk_size: Option<u64>,
    concurrency: Option<usize>,
) -> Result<()> {
    let size = std::fs::metadata(path)
        .with_context(|| format!("reading metadata of {}", path.display()))?
        .len();
    let chunk_size = chunk_size.unwrap_or(cfg.chunk_size);
    let limit = concurrency.unwrap_or(cfg.concurrency_limit);
    if limit == 0 {
        anyhow::bail!("concurrency must be > 0");
    }
    let plan = plan_chunks(size, chunk_size)?;

    println!(
        "{}: {} bytes, {} chunks of {} bytes, {} per batch",
        path.display(),
        size,
        plan.len(),
        chunk_size,
        limit
    );
    println!("{:<6} {:<6} {:<14} {:<14} {}", "BATCH", "CHUNK", "START", "END", "LEN");
    for (batch_no, batch) in batch_ranges(plan.len(), limit).into_iter().enumerate() {
        for index in batch {
            if let Some(r) = plan.range(index) {
                println!("{:<6} {:<6} {:<14} {:<14} {}", batch_no, index, r.start, r.end, r.len());
            }
        }
    }
    Ok(())
}
