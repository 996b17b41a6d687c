//! Chunked, resumable-style file upload over HTTP.
//!
//! A file is validated, split into fixed-size chunks, sent in batches of
//! bounded concurrency, and assembled by a final finalize call.

pub mod config;
pub mod error;
pub mod finalize;
pub mod logging;
pub mod planner;
pub mod progress;
pub mod retry;
pub mod scheduler;
pub mod session;
pub mod source;
pub mod transport;
pub mod uploader;
pub mod validate;

#[cfg(test)]
mod test_support;

pub use error::{TransportError, UploadError, ValidationError};
pub use finalize::FinalizedArtifact;
pub use uploader::{UploadFile, UploadOptions, Uploader};
