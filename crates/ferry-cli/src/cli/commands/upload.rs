//! `ferry upload <path>` – validate, chunk, upload and finalize one file.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use ferry_core::config::FerryConfig;
use ferry_core::{UploadFile, UploadOptions, Uploader};

#[derive(Debug)]
pub struct UploadArgs {
    pub path: PathBuf,
    pub mime: Option<String>,
    pub chunk_size: Option<u64>,
    pub concurrency: Option<usize>,
}

pub async fn run_upload(cfg: &FerryConfig, args: UploadArgs) -> Result<()> {
    cfg.validate()?;
    let file = UploadFile::open(&args.path, args.mime)
        .with_context(|| format!("opening {}", args.path.display()))?;

    let mut options = UploadOptions::from_config(cfg);
    if let Some(size) = args.chunk_size {
        options.chunk_size = size;
    }
    if let Some(n) = args.concurrency {
        options.concurrency_limit = n;
    }
    let options = options.with_progress(Arc::new(|pct: u8| {
        eprint!("\rUploading: {:>3}%", pct);
        let _ = std::io::stderr().flush();
    }));

    let name = file.name.clone();
    let result = Uploader::from_config(cfg).upload_file(file, options).await;
    eprintln!();
    let artifact = result.with_context(|| format!("uploading {}", name))?;

    println!(
        "Uploaded {} ({} bytes, {}) -> {}",
        artifact.file_name, artifact.file_size, artifact.mime_type, artifact.file_url
    );
    Ok(())
}
