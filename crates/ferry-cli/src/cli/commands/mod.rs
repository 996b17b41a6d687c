//! CLI command handlers, one file per command.

mod config;
mod plan;
mod upload;

pub use config::run_config;
pub use plan::run_plan;
pub use upload::{run_upload, UploadArgs};
