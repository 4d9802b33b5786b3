//! Shared fixtures for the integration tests.
//!
//! * [`ScriptedTransport`] — canned replies per route, records every request
//! * [`FakeService`]       — a stateful in-memory document service
//! * [`RecordingWaiter`]   — records poll delays without sleeping

#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use securememo::client::{OutboundBody, OutboundRequest, RawResponse, Transport, TransportError};
use securememo::{IntakeRecord, ServiceConfig, Waiter};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub const GEN_BASE: &str = "https://gen.test";
pub const PDF_BASE: &str = "https://pdf.test";

pub const GENERATE: &str = "/document-generation/api/GenerateDocumentBase64";
pub const UPLOAD: &str = "/pdf-services/api/documents/upload";
pub const PROTECT: &str = "/pdf-services/api/documents/security/pdf-protect";
pub const TASKS: &str = "/pdf-services/api/tasks/";
pub const DOCUMENTS: &str = "/pdf-services/api/documents/";
pub const DOWNLOAD_SUFFIX: &str = "/download";

pub const GEN_SECRET: &str = "gen-secret-value";
pub const PDF_SECRET: &str = "pdf-secret-value";

/// Route pipeline logs to the test harness. `RUST_LOG` overrides the
/// default `warn` level; repeated calls are harmless.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Config pointing at the test hosts, with `attempts` status checks allowed.
pub fn config(attempts: u32) -> ServiceConfig {
    init_logging();
    ServiceConfig::builder()
        .generation_base_url(GEN_BASE)
        .processing_base_url(PDF_BASE)
        .generation_credentials("gen-id", GEN_SECRET)
        .processing_credentials("pdf-id", PDF_SECRET)
        .poll_interval_ms(1500)
        .poll_max_attempts(attempts)
        .build()
        .unwrap()
}

pub fn intake(value: Value) -> IntakeRecord {
    IntakeRecord::from_value(value).unwrap()
}

pub fn acme() -> IntakeRecord {
    intake(json!({ "startupName": "Acme", "stage": "Seed", "ask": 500000 }))
}

pub fn b64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

// ── Scripted transport ───────────────────────────────────────────────────────

enum Reply {
    Response(RawResponse),
    Unreachable(String),
}

impl Reply {
    fn produce(&self) -> Result<RawResponse, TransportError> {
        match self {
            Reply::Response(r) => Ok(r.clone()),
            Reply::Unreachable(detail) => Err(TransportError::new(detail.clone())),
        }
    }
}

struct Route {
    method: &'static str,
    path: &'static str,
    replies: VecDeque<Reply>,
}

/// Replies are matched by method and URL path prefix. Each route plays its
/// replies in order and repeats the last one once the queue is drained.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    log: Mutex<Vec<OutboundRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(
        self,
        method: &'static str,
        path: &'static str,
        status: u16,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        self.push(method, path, Reply::Response(RawResponse::new(status, body)));
        self
    }

    pub fn on_json(
        self,
        method: &'static str,
        path: &'static str,
        status: u16,
        body: Value,
    ) -> Self {
        self.on(method, path, status, body.to_string())
    }

    pub fn unreachable(self, method: &'static str, path: &'static str, detail: &str) -> Self {
        self.push(method, path, Reply::Unreachable(detail.to_string()));
        self
    }

    fn push(&self, method: &'static str, path: &'static str, reply: Reply) {
        let mut routes = self.routes.lock().unwrap();
        match routes.iter_mut().find(|r| r.method == method && r.path == path) {
            Some(route) => route.replies.push_back(reply),
            None => routes.push(Route {
                method,
                path,
                replies: VecDeque::from([reply]),
            }),
        }
    }

    /// Every request in send order.
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.log.lock().unwrap().clone()
    }

    /// `"METHOD /path"` for every request in send order.
    pub fn calls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, path_of(&r.url)))
            .collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| path_of(&r.url).starts_with(prefix))
            .count()
    }

    /// Download requests only. Upload and protect share the documents
    /// prefix, so they are told apart by the trailing segment.
    pub fn downloads(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| is_download(&path_of(&r.url)))
            .count()
    }
}

pub fn is_download(path: &str) -> bool {
    path.starts_with(DOCUMENTS) && path.ends_with(DOWNLOAD_SUFFIX)
}

fn path_of(url: &str) -> String {
    url.strip_prefix(GEN_BASE)
        .or_else(|| url.strip_prefix(PDF_BASE))
        .unwrap_or(url)
        .to_string()
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
        let path = path_of(&request.url);
        let method = request.method.to_string();
        self.log.lock().unwrap().push(request);

        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .filter(|r| r.method == method && path.starts_with(r.path))
            .max_by_key(|r| r.path.len());
        match route {
            Some(route) if route.replies.len() > 1 => route.replies.pop_front().unwrap().produce(),
            Some(route) => route.replies.front().unwrap().produce(),
            None => Ok(RawResponse::new(404, format!("no route for {method} {path}"))),
        }
    }
}

/// A transport that answers the whole happy path; status checks report
/// `pending` `pending_checks` times before succeeding.
pub fn happy_path(pending_checks: usize) -> ScriptedTransport {
    let mut t = ScriptedTransport::new()
        .on_json("POST", GENERATE, 200, json!({ "base64FileString": b64(b"%PDF-generated") }))
        .on_json("POST", UPLOAD, 200, json!({ "documentId": "doc-1" }))
        .on_json("POST", PROTECT, 200, json!({ "taskId": "task-1" }));
    for _ in 0..pending_checks {
        t = t.on_json("GET", TASKS, 200, json!({ "status": "PENDING" }));
    }
    t.on_json(
        "GET",
        TASKS,
        200,
        json!({ "status": "COMPLETED", "resultDocumentId": "doc-2" }),
    )
    .on("GET", DOCUMENTS, 200, b"%PDF-protected".to_vec())
}

// ── Stateful fake service ────────────────────────────────────────────────────

#[derive(Default)]
struct FakeState {
    documents: HashMap<String, Vec<u8>>,
    tasks: HashMap<String, (String, String, u32)>,
}

/// In-memory service keeping per-document and per-task state, so runs in
/// parallel can be told apart. Protected output is
/// `LOCKED[<userPassword>]` followed by the uploaded bytes.
pub struct FakeService {
    pending_checks: u32,
    next_id: AtomicU32,
    state: Mutex<FakeState>,
}

impl FakeService {
    pub fn new(pending_checks: u32) -> Self {
        Self {
            pending_checks,
            next_id: AtomicU32::new(1),
            state: Mutex::new(FakeState::default()),
        }
    }

    fn id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn ok(body: Value) -> Result<RawResponse, TransportError> {
        Ok(RawResponse::new(200, body.to_string()))
    }
}

#[async_trait]
impl Transport for FakeService {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
        tokio::task::yield_now().await;
        let path = path_of(&request.url);

        match (&request.body, path.as_str()) {
            (OutboundBody::Json(body), GENERATE) => {
                let name = body["documentValues"]["startupName"].as_str().unwrap_or("?");
                let pdf = format!("%PDF memo for {name}");
                Self::ok(json!({ "base64FileString": b64(pdf.as_bytes()) }))
            }
            (OutboundBody::Multipart { bytes, .. }, UPLOAD) => {
                let id = self.id("doc");
                self.state.lock().unwrap().documents.insert(id.clone(), bytes.clone());
                Self::ok(json!({ "documentId": id }))
            }
            (OutboundBody::Json(body), PROTECT) => {
                let doc = body["documentId"].as_str().unwrap_or_default().to_string();
                let pwd = body["config"]["userPassword"].as_str().unwrap_or_default().to_string();
                let id = self.id("task");
                self.state.lock().unwrap().tasks.insert(id.clone(), (doc, pwd, 0));
                Self::ok(json!({ "taskId": id }))
            }
            (OutboundBody::Empty, p) if p.starts_with(TASKS) => {
                let task = &p[TASKS.len()..];
                let mut state = self.state.lock().unwrap();
                let Some((doc, pwd, checks)) = state.tasks.get_mut(task) else {
                    return Ok(RawResponse::new(404, "unknown task"));
                };
                *checks += 1;
                if *checks <= self.pending_checks {
                    return Self::ok(json!({ "status": "PROCESSING" }));
                }
                let (doc, pwd) = (doc.clone(), pwd.clone());
                let mut locked = format!("LOCKED[{pwd}]").into_bytes();
                locked.extend_from_slice(&state.documents[&doc]);
                let out = format!("{doc}-protected");
                state.documents.insert(out.clone(), locked);
                Self::ok(json!({ "status": "COMPLETED", "resultDocumentId": out }))
            }
            (OutboundBody::Empty, p) if is_download(p) => {
                let id = &p[DOCUMENTS.len()..p.len() - DOWNLOAD_SUFFIX.len()];
                match self.state.lock().unwrap().documents.get(id) {
                    Some(bytes) => Ok(RawResponse::new(200, bytes.clone())),
                    None => Ok(RawResponse::new(404, "unknown document")),
                }
            }
            _ => Ok(RawResponse::new(404, format!("no route for {path}"))),
        }
    }
}

// ── Waiters ──────────────────────────────────────────────────────────────────

/// Returns immediately and remembers every requested delay.
#[derive(Default)]
pub struct RecordingWaiter {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingWaiter {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Waiter for RecordingWaiter {
    async fn wait(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

/// Never returns.
pub struct StuckWaiter;

#[async_trait]
impl Waiter for StuckWaiter {
    async fn wait(&self, _duration: Duration) {
        std::future::pending::<()>().await;
    }
}
