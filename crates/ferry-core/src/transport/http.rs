//! libcurl chunk POST.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use curl::easy::{Easy, Form, List};

use super::{parse_response, ChunkAck, ChunkRequest, ChunkTransport};
use crate::config::TransportConfig;
use crate::error::TransportError;

/// Build a curl handle for `url` with timeouts and headers applied.
///
/// `Expect:` is always sent empty so curl does not wait for `100 Continue`
/// before multipart bodies.
pub(crate) fn request_handle(
    url: &str,
    headers: &HashMap<String, String>,
    extra_headers: &[&str],
    opts: TransportConfig,
) -> Result<Easy, curl::Error> {
    let mut easy = Easy::new();
    easy.url(url)?;
    // Redirects are not followed: libcurl would replay a POST as GET.
    easy.connect_timeout(Duration::from_secs(opts.connect_timeout_secs))?;
    // Low-speed abort keeps big chunks on slow links alive while still
    // failing a stalled transfer; the hard timeout is the safety net.
    easy.low_speed_limit(opts.low_speed_limit)?;
    easy.low_speed_time(Duration::from_secs(opts.low_speed_time_secs))?;
    easy.timeout(Duration::from_secs(opts.request_timeout_secs))?;

    let mut list = List::new();
    list.append("Expect:")?;
    for h in extra_headers {
        list.append(h)?;
    }
    for (k, v) in headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    easy.http_headers(list)?;
    Ok(easy)
}

/// Run the transfer and return (HTTP status, response body).
pub(crate) fn perform(easy: &mut Easy) -> Result<(u32, Vec<u8>), curl::Error> {
    let mut body = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }
    let code = easy.response_code()?;
    Ok((code, body))
}

/// Posts each chunk as `multipart/form-data` to the chunk endpoint.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    url: String,
    headers: HashMap<String, String>,
    opts: TransportConfig,
}

impl CurlTransport {
    pub fn new(url: impl Into<String>, headers: HashMap<String, String>, opts: TransportConfig) -> Self {
        Self {
            url: url.into(),
            headers,
            opts,
        }
    }

    /// Blocking send; runs on tokio's blocking pool.
    fn send_blocking(&self, request: ChunkRequest) -> Result<ChunkAck, TransportError> {
        let index = request.index.to_string();
        let total = request.total_chunks.to_string();
        let size = request.file_size.to_string();

        let mut form = Form::new();
        form.part("chunk")
            .buffer(&request.file_name, request.data)
            .content_type("application/octet-stream")
            .add()?;
        form.part("chunkIndex").contents(index.as_bytes()).add()?;
        form.part("totalChunks").contents(total.as_bytes()).add()?;
        form.part("fileId").contents(request.session_id.as_bytes()).add()?;
        form.part("fileName").contents(request.file_name.as_bytes()).add()?;
        form.part("fileSize").contents(size.as_bytes()).add()?;

        let mut easy = request_handle(&self.url, &self.headers, &[], self.opts)?;
        easy.httppost(form)?;
        let (code, body) = perform(&mut easy)?;
        parse_response(code, &body)
    }
}

#[async_trait]
impl ChunkTransport for CurlTransport {
    async fn send(&self, request: ChunkRequest) -> Result<ChunkAck, TransportError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.send_blocking(request))
            .await
            .map_err(|e| TransportError::Join(e.to_string()))?
    }
}
