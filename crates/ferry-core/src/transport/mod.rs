//! Chunk transport: one HTTP transfer of a single chunk plus its metadata.
//!
//! [`ChunkTransport`] is the seam the scheduler talks to; [`CurlTransport`]
//! is the libcurl implementation posting the multipart body the chunk
//! endpoint expects. Implementations do not touch shared state; the caller
//! updates chunk status from the returned result.

mod envelope;
mod http;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::TransportError;

pub use http::CurlTransport;
pub(crate) use http::{perform, request_handle};
pub use envelope::{parse_response, Envelope};

/// Everything needed to upload one chunk.
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    pub session_id: String,
    pub index: usize,
    pub total_chunks: usize,
    pub file_name: String,
    pub file_size: u64,
    /// Exactly the bytes of the chunk's range.
    pub data: Vec<u8>,
}

/// Server receipt for one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkAck {
    pub index: usize,
    pub received_bytes: u64,
}

/// Uploads single chunks.
#[async_trait]
pub trait ChunkTransport: Send + Sync {
    /// Upload `request.data`. Resolves with the server's receipt, or the
    /// failure (server message preferred) when the network or server fails.
    async fn send(&self, request: ChunkRequest) -> Result<ChunkAck, TransportError>;
}

/// Cross-check a receipt against the request that produced it.
pub fn verify_ack(request_index: usize, expected: u64, ack: &ChunkAck) -> Result<(), TransportError> {
    if ack.index != request_index || ack.received_bytes != expected {
        return Err(TransportError::AckMismatch {
            index: request_index,
            expected,
            received: ack.received_bytes,
        });
    }
    Ok(())
}
