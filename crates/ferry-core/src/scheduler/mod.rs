//! Chunk scheduler.
//!
//! Runs a session's plan through a [`ChunkTransport`] in consecutive batches
//! of `concurrency_limit` chunks. Sends within a batch run concurrently; the
//! next batch starts only after every send of the current one has settled
//! (batch barrier, not a sliding window). The first failure ends the run
//! once its batch has settled; later batches are never started.

mod batch;

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::error::{TransportError, UploadError};
use crate::planner::ChunkStatus;
use crate::progress::ProgressAggregator;
use crate::retry::{run_with_retry, RetryPolicy};
use crate::session::{SessionStatus, UploadSession};
use crate::source::FileSource;
use crate::transport::{verify_ack, ChunkAck, ChunkRequest, ChunkTransport};

pub use batch::batch_ranges;

/// Outcome of one spawned send: (index, attempts, result).
type SendOutcome = (usize, u32, Result<ChunkAck, TransportError>);

pub struct UploadScheduler {
    transport: Arc<dyn ChunkTransport>,
    concurrency_limit: usize,
    retry: RetryPolicy,
}

impl UploadScheduler {
    /// Scheduler without retries: a failed send fails the upload.
    pub fn new(transport: Arc<dyn ChunkTransport>, concurrency_limit: usize) -> Self {
        Self {
            transport,
            concurrency_limit,
            retry: RetryPolicy::never(),
        }
    }

    /// Retry transient chunk failures with `policy` before giving up.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Upload every chunk of `session` from `source`, accounting completed
    /// chunks in `progress` as they settle.
    pub async fn run(
        &self,
        session: &mut UploadSession,
        source: &FileSource,
        progress: &ProgressAggregator,
    ) -> Result<(), UploadError> {
        if self.concurrency_limit == 0 {
            return Err(UploadError::InvalidInput("concurrency limit must be > 0".into()));
        }
        if session.status() != SessionStatus::Uploading {
            return Err(UploadError::InvalidTransition {
                from: session.status(),
                to: SessionStatus::Uploading,
            });
        }

        let total_chunks = session.total_chunks();
        let batches = batch_ranges(total_chunks, self.concurrency_limit);
        tracing::info!(
            session = %session.session_id,
            total_chunks,
            batches = batches.len(),
            limit = self.concurrency_limit,
            "uploading chunks"
        );

        for (batch_no, batch) in batches.into_iter().enumerate() {
            tracing::debug!(batch = batch_no, start = batch.start, end = batch.end, "starting batch");
            let mut in_flight: JoinSet<SendOutcome> = JoinSet::new();
            let mut first_error: Option<UploadError> = None;

            for index in batch.clone() {
                let task = &mut session.tasks[index];
                let data = match source.read_range(task.range) {
                    Ok(d) => d,
                    Err(e) => {
                        task.status = ChunkStatus::Failed;
                        first_error = Some(UploadError::Io(e));
                        break;
                    }
                };
                task.status = ChunkStatus::InFlight;
                let request = ChunkRequest {
                    session_id: session.session_id.clone(),
                    index,
                    total_chunks,
                    file_name: session.file_name.clone(),
                    file_size: session.file_size,
                    data,
                };
                in_flight.spawn(send_chunk(Arc::clone(&self.transport), self.retry, request));
            }

            let mut panic_message: Option<String> = None;
            while let Some(joined) = in_flight.join_next().await {
                let (index, attempts, result) = match joined {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        panic_message.get_or_insert_with(|| e.to_string());
                        continue;
                    }
                };
                let task = &mut session.tasks[index];
                task.attempt = attempts;
                match result {
                    Ok(ack) => {
                        task.status = ChunkStatus::Succeeded;
                        let pct = progress.accumulate(index, task.range.len());
                        tracing::debug!(index, received = ack.received_bytes, attempts, pct, "chunk uploaded");
                    }
                    Err(cause) => {
                        task.status = ChunkStatus::Failed;
                        tracing::warn!(index, attempts, "chunk failed: {}", cause);
                        if first_error.is_none() {
                            first_error = Some(UploadError::ChunkUpload { index, cause });
                        }
                    }
                }
            }

            // A send that panicked never reported back; it is still InFlight.
            if let Some(msg) = panic_message {
                for index in batch {
                    let task = &mut session.tasks[index];
                    if task.status == ChunkStatus::InFlight {
                        task.status = ChunkStatus::Failed;
                        if first_error.is_none() {
                            first_error = Some(UploadError::ChunkUpload {
                                index,
                                cause: TransportError::Join(msg.clone()),
                            });
                        }
                    }
                }
            }

            if let Some(e) = first_error {
                tracing::warn!(
                    session = %session.session_id,
                    batch = batch_no,
                    pending = session.count_with_status(ChunkStatus::Pending),
                    "aborting upload: {}",
                    e
                );
                return Err(e);
            }
        }
        Ok(())
    }
}

/// Send one chunk (with retries when the policy allows) and check the receipt.
async fn send_chunk(
    transport: Arc<dyn ChunkTransport>,
    policy: RetryPolicy,
    request: ChunkRequest,
) -> SendOutcome {
    let index = request.index;
    let expected = request.data.len() as u64;
    if policy.max_attempts <= 1 {
        let result = send_checked(transport.as_ref(), request, expected).await;
        return (index, 1, result);
    }
    let (result, attempts) = run_with_retry(&policy, || {
        let transport = Arc::clone(&transport);
        let request = request.clone();
        async move { send_checked(transport.as_ref(), request, expected).await }
    })
    .await;
    (index, attempts, result)
}

async fn send_checked(
    transport: &dyn ChunkTransport,
    request: ChunkRequest,
    expected: u64,
) -> Result<ChunkAck, TransportError> {
    let index = request.index;
    let ack = transport.send(request).await?;
    verify_ack(index, expected, &ack)?;
    Ok(ack)
}
