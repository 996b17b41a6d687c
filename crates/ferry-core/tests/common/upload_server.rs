//! Minimal HTTP/1.1 upload server for integration tests.
//!
//! `POST /api/upload/chunk` accepts one multipart chunk and stores it under
//! its `fileId`. `POST /api/upload/finalize` checks that every chunk arrived
//! and assembles the file. Responses use the `{status, message, data}`
//! envelope. `/api/upload/moved` always redirects to the chunk endpoint.
//! One request per connection.

use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};

#[derive(Debug, Clone, Default)]
pub struct UploadServerOptions {
    /// Reject this chunk index with (HTTP status, error message).
    pub reject_chunk: Option<(usize, u16, String)>,
    /// Acknowledge this chunk index but never store it.
    pub drop_chunk: Option<usize>,
}

#[derive(Default)]
struct State {
    chunks: HashMap<String, BTreeMap<usize, Vec<u8>>>,
    assembled: HashMap<String, Vec<u8>>,
    chunk_posts: usize,
    finalize_posts: usize,
}

/// Handle to a running server. The server runs until the process exits.
#[derive(Clone)]
pub struct UploadServer {
    base: String,
    state: Arc<Mutex<State>>,
}

impl UploadServer {
    pub fn chunk_url(&self) -> String {
        format!("{}api/upload/chunk", self.base)
    }

    /// Answers every request with `302` pointing at the chunk endpoint.
    pub fn moved_url(&self) -> String {
        format!("{}api/upload/moved", self.base)
    }

    pub fn finalize_url(&self) -> String {
        format!("{}api/upload/finalize", self.base)
    }

    /// Bytes assembled by a successful finalize, keyed by `fileId`.
    pub fn assembled(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().assembled.values().cloned().collect()
    }

    pub fn chunk_posts(&self) -> usize {
        self.state.lock().unwrap().chunk_posts
    }

    pub fn finalize_posts(&self) -> usize {
        self.state.lock().unwrap().finalize_posts
    }
}

pub fn start() -> UploadServer {
    start_with_options(UploadServerOptions::default())
}

pub fn start_with_options(opts: UploadServerOptions) -> UploadServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let state = Arc::new(Mutex::new(State::default()));
    let shared = Arc::clone(&state);
    let opts = Arc::new(opts);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let state = Arc::clone(&shared);
            let opts = Arc::clone(&opts);
            thread::spawn(move || handle(stream, &state, &opts));
        }
    });
    UploadServer {
        base: format!("http://127.0.0.1:{}/", port),
        state,
    }
}

struct Request {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Request {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn handle(stream: TcpStream, state: &Mutex<State>, opts: &UploadServerOptions) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let mut writer = match stream.try_clone() {
        Ok(s) => s,
        Err(_) => return,
    };
    let mut reader = BufReader::new(stream);
    let req = match read_request(&mut reader, &mut writer) {
        Some(r) => r,
        None => return,
    };

    if req.path == "/api/upload/moved" {
        let _ = writer.write_all(
            b"HTTP/1.1 302 Found\r\nLocation: /api/upload/chunk\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        return;
    }

    let (code, body) = match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/api/upload/chunk") => chunk(&req, state, opts),
        ("POST", "/api/upload/finalize") => finalize(&req, state),
        _ => (404, error_body("Not found")),
    };
    let body = body.to_string();
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        code,
        reason(code),
        body.len(),
        body
    );
    let _ = writer.write_all(response.as_bytes());
}

fn read_request(reader: &mut BufReader<TcpStream>, writer: &mut TcpStream) -> Option<Request> {
    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        let mut h = String::new();
        if reader.read_line(&mut h).ok()? == 0 {
            return None;
        }
        let h = h.trim_end();
        if h.is_empty() {
            break;
        }
        if let Some((k, v)) = h.split_once(':') {
            headers.push((k.trim().to_string(), v.trim().to_string()));
        }
    }
    let mut req = Request {
        method,
        path,
        headers,
        body: Vec::new(),
    };

    if req
        .header("expect")
        .is_some_and(|v| v.eq_ignore_ascii_case("100-continue"))
    {
        writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").ok()?;
    }
    if req
        .header("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    {
        req.body = read_chunked(reader)?;
    } else {
        let len: usize = req.header("content-length").and_then(|v| v.parse().ok()).unwrap_or(0);
        let mut body = vec![0u8; len];
        reader.read_exact(&mut body).ok()?;
        req.body = body;
    }
    Some(req)
}

fn read_chunked(reader: &mut BufReader<TcpStream>) -> Option<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let mut size_line = String::new();
        reader.read_line(&mut size_line).ok()?;
        let size = usize::from_str_radix(size_line.trim().split(';').next()?, 16).ok()?;
        let mut piece = vec![0u8; size + 2];
        reader.read_exact(&mut piece).ok()?;
        if size == 0 {
            return Some(body);
        }
        body.extend_from_slice(&piece[..size]);
    }
}

fn chunk(req: &Request, state: &Mutex<State>, opts: &UploadServerOptions) -> (u16, Value) {
    state.lock().unwrap().chunk_posts += 1;

    let fields = match req.header("content-type").and_then(boundary) {
        Some(b) => parse_multipart(&req.body, &b),
        None => return (400, error_body("Expected multipart/form-data")),
    };
    let text = |name: &str| {
        fields
            .get(name)
            .and_then(|v| std::str::from_utf8(v).ok())
            .map(str::to_string)
    };
    let (Some(data), Some(index), Some(file_id)) = (
        fields.get("chunk"),
        text("chunkIndex").and_then(|v| v.parse::<usize>().ok()),
        text("fileId"),
    ) else {
        return (400, error_body("Missing required fields"));
    };

    if let Some((reject, code, message)) = &opts.reject_chunk {
        if *reject == index {
            return (*code, error_body(message));
        }
    }
    if opts.drop_chunk != Some(index) {
        state
            .lock()
            .unwrap()
            .chunks
            .entry(file_id)
            .or_default()
            .insert(index, data.clone());
    }
    (
        200,
        json!({
            "status": "success",
            "message": "Chunk uploaded",
            "data": { "index": index, "receivedBytes": data.len() }
        }),
    )
}

fn finalize(req: &Request, state: &Mutex<State>) -> (u16, Value) {
    let mut st = state.lock().unwrap();
    st.finalize_posts += 1;

    let body: Value = match serde_json::from_slice(&req.body) {
        Ok(v) => v,
        Err(_) => return (400, error_body("Invalid JSON")),
    };
    let (Some(file_id), Some(total), Some(file_name), Some(file_size)) = (
        body["fileId"].as_str(),
        body["totalChunks"].as_u64(),
        body["fileName"].as_str(),
        body["fileSize"].as_u64(),
    ) else {
        return (400, error_body("Missing required fields"));
    };

    let stored = st.chunks.remove(file_id).unwrap_or_default();
    for i in 0..total as usize {
        if !stored.contains_key(&i) {
            return (400, error_body(&format!("Missing chunk {} of {}", i, total)));
        }
    }
    let assembled: Vec<u8> = stored.into_values().flatten().collect();
    if assembled.len() as u64 != file_size {
        return (400, error_body("Assembled size does not match fileSize"));
    }
    st.assembled.insert(file_id.to_string(), assembled);
    (
        200,
        json!({
            "status": "success",
            "message": "File uploaded",
            "data": {
                "fileName": file_name,
                "fileUrl": format!("/uploads/{}", file_name),
                "fileSize": file_size,
                "mimeType": "application/pdf",
                "uploadedAt": "2026-01-01T00:00:00Z"
            }
        }),
    )
}

fn error_body(message: &str) -> Value {
    json!({ "status": "error", "message": message })
}

fn reason(code: u16) -> &'static str {
    match code {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        503 => "Service Unavailable",
        _ => "Error",
    }
}

fn boundary(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|p| {
        let p = p.trim();
        p.strip_prefix("boundary=").map(|b| b.trim_matches('"').to_string())
    })
}

/// Field name -> raw value for every part of a multipart body.
fn parse_multipart(body: &[u8], boundary: &str) -> HashMap<String, Vec<u8>> {
    let delim = format!("--{}", boundary).into_bytes();
    let mut fields = HashMap::new();
    let mut rest = body;
    while let Some(pos) = find(rest, &delim) {
        rest = &rest[pos + delim.len()..];
        if rest.starts_with(b"--") {
            break;
        }
        let rest_part = rest.strip_prefix(b"\r\n").unwrap_or(rest);
        let end = find(rest_part, &delim).unwrap_or(rest_part.len());
        let part = &rest_part[..end];
        if let Some(split) = find(part, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&part[..split]);
            let value = &part[split + 4..];
            let value = value.strip_suffix(b"\r\n").unwrap_or(value);
            if let Some(name) = part_name(&head) {
                fields.insert(name, value.to_vec());
            }
        }
        rest = &rest_part[end..];
    }
    fields
}

fn part_name(head: &str) -> Option<String> {
    let disposition = head
        .lines()
        .find(|l| l.to_ascii_lowercase().starts_with("content-disposition"))?;
    let start = disposition.find("name=\"")? + 6;
    let len = disposition[start..].find('"')?;
    Some(disposition[start..start + len].to_string())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
