//! Finalize: ask the server to assemble the uploaded chunks.
//!
//! The server is expected to check that exactly `totalChunks` chunks arrived
//! for `fileId` and to fail the call otherwise. The coordinator calls the
//! endpoint at most once per session and never retries it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::TransportConfig;
use crate::error::{TransportError, UploadError};
use crate::session::{SessionStatus, UploadSession};
use crate::transport::{parse_response, perform, request_handle};

/// JSON body of the finalize call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub file_id: String,
    pub total_chunks: usize,
    pub file_name: String,
    pub file_size: u64,
}

/// Descriptor of the assembled file, as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedArtifact {
    pub file_name: String,
    pub file_url: String,
    pub file_size: u64,
    pub mime_type: String,
    pub uploaded_at: String,
}

#[async_trait]
pub trait FinalizeClient: Send + Sync {
    async fn finalize(&self, request: FinalizeRequest) -> Result<FinalizedArtifact, TransportError>;
}

/// Posts the finalize request as JSON with libcurl.
#[derive(Debug, Clone)]
pub struct CurlFinalizer {
    url: String,
    headers: HashMap<String, String>,
    opts: TransportConfig,
}

impl CurlFinalizer {
    pub fn new(url: impl Into<String>, headers: HashMap<String, String>, opts: TransportConfig) -> Self {
        Self {
            url: url.into(),
            headers,
            opts,
        }
    }

    fn finalize_blocking(&self, request: &FinalizeRequest) -> Result<FinalizedArtifact, TransportError> {
        let body =
            serde_json::to_vec(request).map_err(|e| TransportError::Malformed(e.to_string()))?;
        let mut easy = request_handle(
            &self.url,
            &self.headers,
            &["Content-Type: application/json", "Accept: application/json"],
            self.opts,
        )?;
        easy.post(true)?;
        easy.post_fields_copy(&body)?;
        let (code, resp) = perform(&mut easy)?;
        parse_response(code, &resp)
    }
}

#[async_trait]
impl FinalizeClient for CurlFinalizer {
    async fn finalize(&self, request: FinalizeRequest) -> Result<FinalizedArtifact, TransportError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.finalize_blocking(&request))
            .await
            .map_err(|e| TransportError::Join(e.to_string()))?
    }
}

/// Drives a session through `Finalizing` to `Completed` or `Failed`.
pub struct FinalizeCoordinator {
    client: Arc<dyn FinalizeClient>,
}

impl FinalizeCoordinator {
    pub fn new(client: Arc<dyn FinalizeClient>) -> Self {
        Self { client }
    }

    /// Finalize `session`. It must be `Uploading` with every chunk succeeded;
    /// otherwise this fails with `InvalidTransition` and sends nothing.
    pub async fn finalize(&self, session: &mut UploadSession) -> Result<FinalizedArtifact, UploadError> {
        if session.status() != SessionStatus::Uploading || !session.all_chunks_succeeded() {
            return Err(UploadError::InvalidTransition {
                from: session.status(),
                to: SessionStatus::Finalizing,
            });
        }
        session.transition(SessionStatus::Finalizing)?;

        let request = FinalizeRequest {
            file_id: session.session_id.clone(),
            total_chunks: session.total_chunks(),
            file_name: session.file_name.clone(),
            file_size: session.file_size,
        };
        tracing::info!(session = %request.file_id, total_chunks = request.total_chunks, "finalizing upload");

        match self.client.finalize(request).await {
            Ok(artifact) => {
                session.transition(SessionStatus::Completed)?;
                tracing::info!(session = %session.session_id, url = %artifact.file_url, "upload finalized");
                Ok(artifact)
            }
            Err(cause) => {
                session.fail();
                tracing::warn!(session = %session.session_id, "finalize failed: {}", cause);
                Err(UploadError::Finalize { cause })
            }
        }
    }
}
