//! Upload driver: validate, plan, upload chunks, finalize.

use std::path::Path;
use std::sync::Arc;

use crate::config::{AllowedType, FerryConfig};
use crate::error::UploadError;
use crate::finalize::{CurlFinalizer, FinalizeClient, FinalizeCoordinator, FinalizedArtifact};
use crate::planner::plan_chunks;
use crate::progress::{ProgressAggregator, ProgressCallback};
use crate::retry::RetryPolicy;
use crate::scheduler::UploadScheduler;
use crate::session::{SessionStatus, UploadSession};
use crate::source::FileSource;
use crate::transport::{ChunkTransport, CurlTransport};
use crate::validate::validate_file;

/// A file to upload: its bytes, the name sent to the server, and an
/// optional declared MIME type (inferred from the extension when absent).
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub source: FileSource,
    pub name: String,
    pub mime: Option<String>,
}

impl UploadFile {
    pub fn open(path: &Path, mime: Option<String>) -> Result<Self, UploadError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UploadError::InvalidInput(format!("no file name in {}", path.display())))?
            .to_string();
        Ok(Self {
            source: FileSource::open(path)?,
            name,
            mime,
        })
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>, mime: Option<String>) -> Self {
        Self {
            source: FileSource::from_bytes(bytes),
            name: name.into(),
            mime,
        }
    }
}

/// Per-upload knobs.
#[derive(Clone)]
pub struct UploadOptions {
    pub chunk_size: u64,
    pub concurrency_limit: usize,
    pub on_progress: Option<ProgressCallback>,
}

impl UploadOptions {
    pub fn from_config(cfg: &FerryConfig) -> Self {
        Self {
            chunk_size: cfg.chunk_size,
            concurrency_limit: cfg.concurrency_limit,
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }
}

impl std::fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadOptions")
            .field("chunk_size", &self.chunk_size)
            .field("concurrency_limit", &self.concurrency_limit)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

pub struct Uploader {
    transport: Arc<dyn ChunkTransport>,
    finalizer: FinalizeCoordinator,
    max_file_size: u64,
    allowed_types: Vec<AllowedType>,
    retry: RetryPolicy,
}

impl Uploader {
    /// Curl-backed uploader for the endpoints in `cfg`.
    pub fn from_config(cfg: &FerryConfig) -> Self {
        let opts = cfg.transport_or_default();
        let transport = Arc::new(CurlTransport::new(cfg.chunk_url.clone(), cfg.headers.clone(), opts));
        let finalizer = Arc::new(CurlFinalizer::new(cfg.finalize_url.clone(), cfg.headers.clone(), opts));
        let retry = cfg
            .retry
            .as_ref()
            .map(RetryPolicy::from_config)
            .unwrap_or_else(RetryPolicy::never);
        Self::with_clients(transport, finalizer, cfg.max_file_size, cfg.allowed_types.clone(), retry)
    }

    pub fn with_clients(
        transport: Arc<dyn ChunkTransport>,
        finalizer: Arc<dyn FinalizeClient>,
        max_file_size: u64,
        allowed_types: Vec<AllowedType>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            finalizer: FinalizeCoordinator::new(finalizer),
            max_file_size,
            allowed_types,
            retry,
        }
    }

    /// Upload `file` and return the server's descriptor of the assembled file.
    ///
    /// Nothing is sent when validation fails. Progress reaches 100 only after
    /// the finalize call succeeds.
    pub async fn upload_file(&self, file: UploadFile, options: UploadOptions) -> Result<FinalizedArtifact, UploadError> {
        let size = file.source.len();
        let mut session = UploadSession::new(file.name.clone(), size, String::new(), options.chunk_size);
        tracing::info!(session = %session.session_id, file = %file.name, size, "starting upload");

        match self.drive(&mut session, &file, &options).await {
            Ok(artifact) => Ok(artifact),
            Err(e) => {
                session.fail();
                tracing::error!(session = %session.session_id, file = %file.name, "upload failed: {}", e);
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        session: &mut UploadSession,
        file: &UploadFile,
        options: &UploadOptions,
    ) -> Result<FinalizedArtifact, UploadError> {
        session.mime_type = validate_file(
            &file.name,
            file.mime.as_deref(),
            session.file_size,
            self.max_file_size,
            &self.allowed_types,
        )?;
        if options.chunk_size == 0 {
            return Err(UploadError::InvalidInput("chunk size must be > 0".into()));
        }
        if options.concurrency_limit == 0 {
            return Err(UploadError::InvalidInput("concurrency limit must be > 0".into()));
        }

        // Inputs are checked; planning cannot fail from here on.
        session.transition(SessionStatus::Planning)?;
        let plan = plan_chunks(session.file_size, options.chunk_size)?;
        session.start_upload(&plan)?;
        tracing::debug!(
            session = %session.session_id,
            mime = %session.mime_type,
            chunks = plan.len(),
            chunk_size = plan.chunk_size(),
            "planned upload"
        );

        let progress = ProgressAggregator::new(session.file_size, plan.len(), options.on_progress.clone());
        let scheduler =
            UploadScheduler::new(Arc::clone(&self.transport), options.concurrency_limit).with_retry(self.retry);
        scheduler.run(session, &file.source, &progress).await?;

        let artifact = self.finalizer.finalize(session).await?;
        progress.finish();
        Ok(artifact)
    }
}
