//! In-process mock LCS/RS upstreams for exchange and router tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;

use ceno_core::ClientConfig;

use crate::REWRITTEN_HEADER;

/// What the mock upstream answers with.
#[derive(Clone)]
pub struct MockBehavior {
    pub lookup_status: StatusCode,
    pub lookup_body: String,
    pub create_status: StatusCode,
    pub report_status: StatusCode,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            lookup_status: StatusCode::OK,
            lookup_body: "{}".to_string(),
            create_status: StatusCode::OK,
            report_status: StatusCode::OK,
        }
    }
}

/// What the mock upstream observed, for assertions.
#[derive(Clone, Default)]
pub struct MockLog {
    pub lookups: Arc<AtomicUsize>,
    pub creations: Arc<AtomicUsize>,
    pub reports: Arc<AtomicUsize>,
    pub last_create_body: Arc<Mutex<Option<String>>>,
    pub last_rewritten: Arc<Mutex<Option<String>>>,
}

#[derive(Clone)]
struct MockState {
    behavior: MockBehavior,
    log: MockLog,
}

/// A running mock serving the LCS lookup, RS create, and decode-error
/// report endpoints on one ephemeral port.
pub struct MockUpstream {
    pub addr: SocketAddr,
    pub log: MockLog,
}

pub async fn spawn_upstream(behavior: MockBehavior) -> MockUpstream {
    let log = MockLog::default();
    let state = MockState {
        behavior,
        log: log.clone(),
    };
    let router = Router::new()
        .route("/lookup", get(mock_lookup))
        .route("/create", post(mock_create))
        .route("/error/decode", post(mock_report))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    MockUpstream { addr, log }
}

async fn mock_lookup(State(state): State<MockState>) -> (StatusCode, String) {
    state.log.lookups.fetch_add(1, Ordering::SeqCst);
    (state.behavior.lookup_status, state.behavior.lookup_body)
}

async fn mock_create(
    State(state): State<MockState>,
    headers: HeaderMap,
    body: String,
) -> StatusCode {
    state.log.creations.fetch_add(1, Ordering::SeqCst);
    *state.log.last_create_body.lock().unwrap() = Some(body);
    *state.log.last_rewritten.lock().unwrap() = headers
        .get(REWRITTEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state.behavior.create_status
}

async fn mock_report(State(state): State<MockState>) -> StatusCode {
    state.log.reports.fetch_add(1, Ordering::SeqCst);
    state.behavior.report_status
}

/// Config pointing every endpoint at the mock upstream.
pub fn upstream_config(addr: SocketAddr) -> ClientConfig {
    ClientConfig {
        lcs_lookup_endpoint: format!("http://{addr}/lookup"),
        rs_create_endpoint: format!("http://{addr}/create"),
        decode_error_endpoint: format!("http://{addr}/error/decode"),
        upstream_timeout_secs: 2,
        ..ClientConfig::default()
    }
}

/// An address nothing is listening on.
pub async fn dead_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
