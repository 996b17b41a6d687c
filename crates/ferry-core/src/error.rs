//! Error taxonomy for the upload pipeline.
//!
//! Every variant is terminal for the session that produced it; callers show
//! the `Display` text to the user directly.

use crate::session::SessionStatus;

/// Why a file was rejected before any network I/O.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("file type {mime} is not allowed")]
    UnsupportedType { mime: String },
    #[error("file extension .{extension} does not match type {mime}")]
    ExtensionMismatch { mime: String, extension: String },
    #[error("could not determine the type of {file_name}")]
    UnknownType { file_name: String },
    #[error("file is empty")]
    Empty,
    #[error("file is too large: {size} bytes exceeds the limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
}

/// Failure of a single HTTP exchange (chunk send or finalize call).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("{0}")]
    Curl(#[from] curl::Error),
    #[error("build multipart body: {0}")]
    Form(#[from] curl::FormError),
    /// Non-2xx response. `message` is the server's message when the body carried one.
    #[error("{}", .message.as_deref().unwrap_or("upload request failed"))]
    Http { status: u32, message: Option<String> },
    /// 2xx response whose envelope reported `status: "error"`.
    #[error("{}", .message.as_deref().unwrap_or("server rejected the request"))]
    Server { message: Option<String> },
    #[error("malformed server response: {0}")]
    Malformed(String),
    #[error("server acknowledged chunk {index} with {received} bytes, expected {expected}")]
    AckMismatch {
        index: usize,
        expected: u64,
        received: u64,
    },
    #[error("transfer task failed: {0}")]
    Join(String),
}

impl TransportError {
    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u32> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Top-level error returned by the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("chunk {index}: {cause}")]
    ChunkUpload {
        index: usize,
        #[source]
        cause: TransportError,
    },
    #[error("finalize failed: {cause}")]
    Finalize {
        #[source]
        cause: TransportError,
    },
    #[error("session cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },
    #[error("read source: {0}")]
    Io(#[from] std::io::Error),
}
