//! Upload session: identity, chunk plan, per-chunk state and lifecycle.
//!
//! A session lives in memory for one upload attempt and is discarded once it
//! reaches `Completed` or `Failed`.

use crate::error::UploadError;
use crate::planner::{ChunkPlan, ChunkStatus, ChunkTask};

/// Session lifecycle. Moves forward only; `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Validating,
    Planning,
    Uploading,
    Finalizing,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }

    /// Whether `self -> to` is a legal step.
    pub fn can_transition_to(self, to: SessionStatus) -> bool {
        use SessionStatus::*;
        match (self, to) {
            (Validating, Planning)
            | (Planning, Uploading)
            | (Uploading, Finalizing)
            | (Finalizing, Completed) => true,
            (Validating | Uploading | Finalizing, Failed) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadSession {
    /// Client-generated id correlating every chunk and the finalize call.
    pub session_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: String,
    pub chunk_size: u64,
    pub tasks: Vec<ChunkTask>,
    status: SessionStatus,
}

impl UploadSession {
    /// New session in `Validating` with a fresh UUID v4 id.
    pub fn new(file_name: impl Into<String>, file_size: u64, mime_type: impl Into<String>, chunk_size: u64) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            file_name: file_name.into(),
            file_size,
            mime_type: mime_type.into(),
            chunk_size,
            tasks: Vec::new(),
            status: SessionStatus::Validating,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn total_chunks(&self) -> usize {
        self.tasks.len()
    }

    /// Move to `to`, rejecting backwards or skipped steps.
    pub fn transition(&mut self, to: SessionStatus) -> Result<(), UploadError> {
        if !self.status.can_transition_to(to) {
            return Err(UploadError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        tracing::debug!(session = %self.session_id, from = ?self.status, ?to, "session transition");
        self.status = to;
        Ok(())
    }

    /// Mark the session failed from `Validating`, `Uploading` or `Finalizing`;
    /// a no-op in any other state.
    pub fn fail(&mut self) {
        if !self.status.is_terminal() {
            let _ = self.transition(SessionStatus::Failed);
        }
    }

    /// Install the plan's tasks and move `Planning -> Uploading`.
    pub fn start_upload(&mut self, plan: &ChunkPlan) -> Result<(), UploadError> {
        if self.status != SessionStatus::Planning {
            return Err(UploadError::InvalidTransition {
                from: self.status,
                to: SessionStatus::Uploading,
            });
        }
        self.tasks = plan.tasks();
        self.transition(SessionStatus::Uploading)
    }

    /// True when there is at least one task and every task succeeded.
    pub fn all_chunks_succeeded(&self) -> bool {
        !self.tasks.is_empty() && self.tasks.iter().all(|t| t.status == ChunkStatus::Succeeded)
    }

    pub fn count_with_status(&self, status: ChunkStatus) -> usize {
        self.tasks.iter().filter(|t| t.status == status).count()
    }
}
