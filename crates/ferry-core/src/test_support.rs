//! In-process transport and finalize doubles for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::TransportError;
use crate::finalize::{FinalizeClient, FinalizeRequest, FinalizedArtifact};
use crate::transport::{ChunkAck, ChunkRequest, ChunkTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Start(usize),
    Settle(usize),
}

struct Failure {
    remaining: u32,
    status: u32,
    message: Option<String>,
}

/// Records every send; chunks succeed unless told to fail or held on a gate.
#[derive(Default)]
pub struct MockTransport {
    events: Mutex<Vec<Event>>,
    requests: Mutex<Vec<(String, usize, usize, u64)>>,
    failures: Mutex<HashMap<usize, Failure>>,
    gates: Mutex<HashMap<usize, Arc<Notify>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send of `index` fails with HTTP `status`.
    pub fn fail_always(&self, index: usize, status: u32, message: Option<&str>) {
        self.fail_times(index, u32::MAX, status, message);
    }

    /// The first `times` sends of `index` fail with HTTP `status`.
    pub fn fail_times(&self, index: usize, times: u32, status: u32, message: Option<&str>) {
        self.failures.lock().unwrap().insert(
            index,
            Failure {
                remaining: times,
                status,
                message: message.map(str::to_string),
            },
        );
    }

    /// Hold sends of `index` until the returned handle is notified.
    pub fn gate(&self, index: usize) -> Arc<Notify> {
        let n = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(index, Arc::clone(&n));
        n
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Start(i) => Some(i),
                Event::Settle(_) => None,
            })
            .collect()
    }

    pub fn send_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// (session id, index, total chunks, bytes) per send.
    pub fn requests(&self) -> Vec<(String, usize, usize, u64)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn position(&self, event: Event) -> Option<usize> {
        self.events().iter().position(|e| *e == event)
    }

    /// Wait (bounded) until at least `n` sends have started.
    pub async fn wait_started(&self, n: usize) {
        for _ in 0..1000 {
            if self.started().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("only {} sends started, expected {}", self.started().len(), n);
    }
}

#[async_trait]
impl ChunkTransport for MockTransport {
    async fn send(&self, request: ChunkRequest) -> Result<ChunkAck, TransportError> {
        let index = request.index;
        let len = request.data.len() as u64;
        self.events.lock().unwrap().push(Event::Start(index));
        self.requests.lock().unwrap().push((
            request.session_id.clone(),
            index,
            request.total_chunks,
            len,
        ));

        let gate = self.gates.lock().unwrap().get(&index).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let failure = {
            let mut failures = self.failures.lock().unwrap();
            match failures.get_mut(&index) {
                Some(f) if f.remaining > 0 => {
                    f.remaining -= 1;
                    Some((f.status, f.message.clone()))
                }
                _ => None,
            }
        };
        self.events.lock().unwrap().push(Event::Settle(index));
        match failure {
            Some((status, message)) => Err(TransportError::Http { status, message }),
            None => Ok(ChunkAck {
                index,
                received_bytes: len,
            }),
        }
    }
}

/// Finalize double: succeeds with a fixed artifact or fails with a server message.
pub struct MockFinalizer {
    calls: AtomicUsize,
    last: Mutex<Option<FinalizeRequest>>,
    error: Option<String>,
}

impl MockFinalizer {
    pub fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
            error: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::ok()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<FinalizeRequest> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl FinalizeClient for MockFinalizer {
    async fn finalize(&self, request: FinalizeRequest) -> Result<FinalizedArtifact, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(request.clone());
        if let Some(msg) = &self.error {
            return Err(TransportError::Server {
                message: Some(msg.clone()),
            });
        }
        Ok(FinalizedArtifact {
            file_name: request.file_name.clone(),
            file_url: format!("/uploads/{}", request.file_name),
            file_size: request.file_size,
            mime_type: "application/pdf".to_string(),
            uploaded_at: "2026-01-01T00:00:00Z".to_string(),
        })
    }
}
