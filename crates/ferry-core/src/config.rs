use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Retry policy parameters (optional section in config.toml).
///
/// When the section is missing, chunk failures are not retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per chunk (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

/// curl timeouts applied to every request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TransportConfig {
    pub connect_timeout_secs: u64,
    /// Hard wall-clock limit for one request.
    pub request_timeout_secs: u64,
    /// Abort when throughput stays below this many bytes/s ...
    pub low_speed_limit: u32,
    /// ... for this many seconds.
    pub low_speed_time_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            request_timeout_secs: 600,
            low_speed_limit: 1024,
            low_speed_time_secs: 60,
        }
    }
}

/// One accepted file type: a MIME type and the extensions that may carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedType {
    pub mime: String,
    pub extensions: Vec<String>,
}

impl AllowedType {
    fn new(mime: &str, extensions: &[&str]) -> Self {
        Self {
            mime: mime.to_string(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Document and image types accepted by default.
pub fn default_allowed_types() -> Vec<AllowedType> {
    vec![
        AllowedType::new("application/pdf", &["pdf"]),
        AllowedType::new("application/msword", &["doc"]),
        AllowedType::new(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            &["docx"],
        ),
        AllowedType::new("application/vnd.ms-excel", &["xls"]),
        AllowedType::new(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            &["xlsx"],
        ),
        AllowedType::new("image/png", &["png"]),
        AllowedType::new("image/jpeg", &["jpg", "jpeg"]),
        AllowedType::new("text/plain", &["txt"]),
    ]
}

/// Global configuration loaded from `~/.config/ferry/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FerryConfig {
    /// Endpoint receiving one multipart POST per chunk.
    pub chunk_url: String,
    /// Endpoint receiving the JSON finalize request.
    pub finalize_url: String,
    /// Fixed chunk size in bytes.
    pub chunk_size: u64,
    /// Chunks uploaded concurrently per batch.
    pub concurrency_limit: usize,
    /// Largest file accepted, in bytes.
    pub max_file_size: u64,
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<AllowedType>,
    /// Extra request headers sent with every chunk and finalize call.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Optional retry policy; if missing, chunk failures are terminal.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Optional curl timeouts; if missing, built-in defaults are used.
    #[serde(default)]
    pub transport: Option<TransportConfig>,
}

impl Default for FerryConfig {
    fn default() -> Self {
        Self {
            chunk_url: "http://127.0.0.1:8080/api/upload/chunk".to_string(),
            finalize_url: "http://127.0.0.1:8080/api/upload/finalize".to_string(),
            chunk_size: 5 * 1024 * 1024,
            concurrency_limit: 3,
            max_file_size: 100 * 1024 * 1024,
            allowed_types: default_allowed_types(),
            headers: HashMap::new(),
            retry: None,
            transport: None,
        }
    }
}

impl FerryConfig {
    /// Check values that serde cannot: positive sizes and http(s) endpoints.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            anyhow::bail!("chunk_size must be > 0");
        }
        if self.concurrency_limit == 0 {
            anyhow::bail!("concurrency_limit must be > 0");
        }
        for (name, value) in [("chunk_url", &self.chunk_url), ("finalize_url", &self.finalize_url)] {
            let parsed = url::Url::parse(value).with_context(|| format!("{} is not a URL", name))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("{} must be http or https, got {}", name, parsed.scheme());
            }
        }
        Ok(())
    }

    pub fn transport_or_default(&self) -> TransportConfig {
        self.transport.unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ferry")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FerryConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FerryConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Parse configuration from an explicit file.
///
/// Values are not checked here; call [`FerryConfig::validate`] before
/// uploading so `ferry config` can still show a broken file.
pub fn load_from_path(path: &Path) -> Result<FerryConfig> {
    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FerryConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
