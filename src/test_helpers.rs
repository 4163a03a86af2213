//! In-process fake backend for HTTP-level tests.
//!
//! An axum router bound to an ephemeral port answers every request from a
//! table of scripted replies keyed by `"METHOD /path"` (the `/api` prefix is
//! stripped) and records what it received.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::net::api::ApiClient;
use crate::storage::{MemoryTokenStore, TokenStore};

#[derive(Clone, Debug)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub content_type: &'static str,
    pub delay: Option<Duration>,
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Default)]
struct FakeState {
    replies: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct FakeBackend {
    addr: SocketAddr,
    state: Arc<FakeState>,
    server: JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { addr, state, server }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_base_url(&self.base_url())
            .unwrap()
            .with_request_timeout(Duration::from_secs(5))
    }

    fn script(&self, method: &str, path: &str, reply: Reply) {
        self.state.replies.lock().unwrap().insert(format!("{method} {path}"), reply);
    }

    pub fn reply_json(&self, method: &str, path: &str, status: u16, body: Value) {
        self.script(method, path, Reply { status, body: body.to_string(), content_type: "application/json", delay: None });
    }

    pub fn reply_text(&self, method: &str, path: &str, status: u16, body: &str) {
        self.script(method, path, Reply { status, body: body.to_owned(), content_type: "text/plain", delay: None });
    }

    pub fn reply_delayed(&self, method: &str, path: &str, delay: Duration) {
        self.script(method, path, Reply { status: 200, body: "{}".to_owned(), content_type: "application/json", delay: Some(delay) });
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn handle(
    State(state): State<Arc<FakeState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let path = uri.path().strip_prefix("/api").unwrap_or(uri.path()).to_owned();
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        query: uri.query().map(str::to_owned),
        authorization,
        body,
    });

    let reply = state.replies.lock().unwrap().get(&format!("{method} {path}")).cloned();
    let Some(reply) = reply else {
        return (StatusCode::NOT_FOUND, "no scripted reply").into_response();
    };
    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, reply.content_type)], reply.body).into_response()
}

/// A base URL nothing listens on.
pub fn unreachable_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/api")
}

/// An [`ApiClient`] wired to `backend` with a fresh in-memory store.
pub fn api_client(backend: &FakeBackend) -> (Arc<ApiClient>, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::new());
    let shared: Arc<dyn TokenStore> = store.clone();
    let api = Arc::new(ApiClient::new(&backend.config(), shared).unwrap());
    (api, store)
}
