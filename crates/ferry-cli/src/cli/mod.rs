//! CLI for the ferry chunked uploader.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ferry_core::config;

use commands::{run_config, run_plan, run_upload, UploadArgs};

/// Top-level CLI for the ferry chunked uploader.
#[derive(Debug, Parser)]
#[command(name = "ferry")]
#[command(about = "ferry: chunked file uploads with bounded concurrency", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Upload a file to the configured endpoints.
    Upload {
        /// File to upload.
        path: PathBuf,
        /// MIME type to declare (inferred from the extension if omitted).
        #[arg(long)]
        mime: Option<String>,
        /// Chunk size in bytes (overrides config).
        #[arg(long, value_name = "BYTES")]
        chunk_size: Option<u64>,
        /// Chunks uploaded concurrently per batch (overrides config).
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,
    },

    /// Show how a file would be chunked and batched, without uploading.
    Plan {
        /// File to plan.
        path: PathBuf,
        #[arg(long, value_name = "BYTES")]
        chunk_size: Option<u64>,
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,
    },

    /// Print the config file location and effective settings.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Upload {
                path,
                mime,
                chunk_size,
                concurrency,
            } => {
                let args = UploadArgs {
                    path,
                    mime,
                    chunk_size,
                    concurrency,
                };
                run_upload(&cfg, args).await?
            }
            CliCommand::Plan {
                path,
                chunk_size,
                concurrency,
            } => run_plan(&cfg, &path, chunk_size, concurrency)?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}
