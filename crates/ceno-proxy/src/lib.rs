//! CENO Proxy - HTTP surface for the CENO client.
//!
//! The proxy mediates between a browser (or any HTTP client) and the bundle
//! network upstreams.
//!
//! ## Endpoints
//!
//! - `GET /lookup?url=<base64-of-target>` - indirect resolution, for
//!   browsers that force HTTPS upgrades
//! - anything else (any method, any path) - catch-all; the full requested
//!   URI is the target to resolve
//!
//! Every response carries the `X-Ceno-Proxy` liveness header, so a request
//! against the listen port doubles as a running-check.
//!
//! ## Example
//!
//! ```no_run
//! use ceno_core::{ClientConfig, Messages};
//! use ceno_proxy::{AppState, ProxyServer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = AppState::new(ClientConfig::default(), Messages::builtin()).unwrap();
//!     ProxyServer::new(state).run().await.unwrap();
//! }
//! ```

pub mod error;
mod handlers;
pub mod interim;
pub mod state;
#[cfg(test)]
mod testutil;
pub mod upstream;

use std::net::SocketAddr;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub use state::AppState;

/// Host the proxy binds to. Localhost only; the proxy mediates for local
/// clients, it is not a public service.
pub const DEFAULT_HOST: [u8; 4] = [127, 0, 0, 1];

/// Header marking every response as served by the CENO client.
pub const PROXY_HEADER: &str = "X-Ceno-Proxy";
/// Value of the liveness header.
pub const PROXY_HEADER_VALUE: &str = "yxorP-oneC-X";
/// Header communicating that a target's scheme was downgraded from HTTPS,
/// honored inbound and forwarded to the RS.
pub const REWRITTEN_HEADER: &str = "X-Ceno-Rewritten";

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {0}: {1}")]
    Bind(SocketAddr, std::io::Error),

    /// Server runtime error.
    #[error("server error: {0}")]
    Runtime(String),
}

/// The mediation proxy server.
pub struct ProxyServer {
    router: Router,
    addr: SocketAddr,
}

impl ProxyServer {
    /// Builds the server from prepared application state.
    pub fn new(state: AppState) -> Self {
        let addr = SocketAddr::from((DEFAULT_HOST, state.config.port));
        Self {
            router: build_router(state),
            addr,
        }
    }

    /// Returns the listen address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the router for testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Runs the server until shutdown.
    pub async fn run(self) -> Result<(), ServerError> {
        info!("Starting CENO client proxy on {}", self.addr);

        // SO_REUSEADDR so a restart can bind while old sockets linger in
        // TIME_WAIT.
        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::Bind(self.addr, e))?;
        socket
            .set_reuse_address(true)
            .map_err(|e| ServerError::Bind(self.addr, e))?;
        socket
            .bind(&self.addr.into())
            .map_err(|e| ServerError::Bind(self.addr, e))?;
        socket
            .listen(128)
            .map_err(|e| ServerError::Bind(self.addr, e))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| ServerError::Bind(self.addr, e))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = tokio::net::TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::Bind(self.addr, e))?;

        axum::serve(listener, self.router)
            .await
            .map_err(|e| ServerError::Runtime(e.to_string()))?;

        Ok(())
    }
}

/// Builds the proxy router: the indirect endpoint, the catch-all, the
/// liveness-header layer, and permissive CORS so browser extensions can call
/// `/lookup` directly.
fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/lookup", get(handlers::direct_lookup))
        .fallback(handlers::resolve_any)
        .layer(middleware::from_fn(proxy_header))
        .layer(cors)
        .with_state(state)
}

/// Attaches the liveness/identity header to every outgoing response.
async fn proxy_header(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(PROXY_HEADER, HeaderValue::from_static(PROXY_HEADER_VALUE));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use ceno_core::{target, ClientConfig, Messages};

    use crate::testutil::{dead_addr, spawn_upstream, upstream_config, MockBehavior, MockUpstream};

    fn test_app(config: ClientConfig) -> Router {
        let state = AppState::new(config, Messages::builtin()).unwrap();
        build_router(state)
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn lookup_json(complete: bool, found: bool, bundle: &str) -> String {
        format!(
            r#"{{"ErrCode":0,"ErrMsg":"","Complete":{complete},"Found":{found},"Bundle":"{bundle}"}}"#
        )
    }

    async fn found_upstream(bundle: &str) -> MockUpstream {
        spawn_upstream(MockBehavior {
            lookup_body: lookup_json(true, true, bundle),
            ..MockBehavior::default()
        })
        .await
    }

    fn proxy_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn found_bundle_is_served_verbatim() {
        let upstream = found_upstream("X").await;
        let app = test_app(upstream_config(upstream.addr));

        let response = app
            .oneshot(proxy_request("http://example.com/page"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(PROXY_HEADER).unwrap(),
            PROXY_HEADER_VALUE
        );
        assert_eq!(body_string(response).await, "X");
        assert_eq!(upstream.log.creations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_bundle_triggers_exactly_one_creation_request() {
        let upstream = spawn_upstream(MockBehavior {
            lookup_body: lookup_json(true, false, ""),
            ..MockBehavior::default()
        })
        .await;
        let app = test_app(upstream_config(upstream.addr));

        let response = app
            .oneshot(proxy_request("http://example.com/page"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        // Template path does not exist under the test cwd, so the plain-text
        // fallback is expected.
        let body = body_string(response).await;
        assert_eq!(body, Messages::builtin().get("please_wait_txt"));
        assert_eq!(upstream.log.creations.load(Ordering::SeqCst), 1);
        assert_eq!(
            upstream.log.last_create_body.lock().unwrap().as_deref(),
            Some("http://example.com/page")
        );
        assert_eq!(
            upstream.log.last_rewritten.lock().unwrap().as_deref(),
            Some("false")
        );
    }

    #[tokio::test]
    async fn in_progress_bundle_shows_interim_without_creation() {
        for found in [false, true] {
            let upstream = spawn_upstream(MockBehavior {
                lookup_body: lookup_json(false, found, ""),
                ..MockBehavior::default()
            })
            .await;
            let app = test_app(upstream_config(upstream.addr));

            let response = app
                .oneshot(proxy_request("http://example.com/page"))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            let body = body_string(response).await;
            assert_eq!(body, Messages::builtin().get("please_wait_txt"));
            assert_eq!(upstream.log.creations.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn malformed_lcs_response_triggers_rebuild_not_error() {
        let upstream = spawn_upstream(MockBehavior {
            lookup_body: "CENO!".to_string(),
            ..MockBehavior::default()
        })
        .await;
        let app = test_app(upstream_config(upstream.addr));

        let response = app
            .oneshot(proxy_request("http://example.com/page"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert_eq!(body, Messages::builtin().get("please_wait_txt"));
        assert_eq!(upstream.log.reports.load(Ordering::SeqCst), 1);
        assert_eq!(upstream.log.creations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_response_with_failed_report_is_an_lcs_error() {
        let upstream = spawn_upstream(MockBehavior {
            lookup_body: "CENO!".to_string(),
            report_status: StatusCode::INTERNAL_SERVER_ERROR,
            ..MockBehavior::default()
        })
        .await;
        let app = test_app(upstream_config(upstream.addr));

        let response = app
            .oneshot(proxy_request("http://example.com/page"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_string(response).await;
        assert!(body.contains("could not be reached"));
        assert_eq!(upstream.log.creations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreachable_lcs_is_an_error_without_creation() {
        let rs = spawn_upstream(MockBehavior::default()).await;
        let mut config = upstream_config(rs.addr);
        config.lcs_lookup_endpoint = format!("http://{}/lookup", dead_addr().await);
        config.upstream_timeout_secs = 1;
        let app = test_app(config);

        let response = app
            .oneshot(proxy_request("http://example.com/page"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(rs.log.creations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreachable_rs_after_miss_is_an_error_not_interim() {
        let lcs = spawn_upstream(MockBehavior {
            lookup_body: lookup_json(true, false, ""),
            ..MockBehavior::default()
        })
        .await;
        let mut config = upstream_config(lcs.addr);
        config.rs_create_endpoint = format!("http://{}/create", dead_addr().await);
        config.upstream_timeout_secs = 1;
        let app = test_app(config);

        let response = app
            .oneshot(proxy_request("http://example.com/page"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_string(response).await;
        assert!(body.contains("Could not ask for the page to be prepared"));
    }

    #[tokio::test]
    async fn lcs_signaled_error_renders_its_message() {
        let upstream = spawn_upstream(MockBehavior {
            lookup_body: r#"{"ErrCode":9999,"ErrMsg":"cache on fire","Complete":false,"Found":false,"Bundle":""}"#.to_string(),
            ..MockBehavior::default()
        })
        .await;
        let app = test_app(upstream_config(upstream.addr));

        let response = app
            .oneshot(proxy_request("http://example.com/page"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_string(response).await;
        assert!(body.contains("cache on fire"));
        assert_eq!(upstream.log.creations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn indirect_lookup_decodes_and_downgrades() {
        let upstream = spawn_upstream(MockBehavior {
            lookup_body: lookup_json(true, false, ""),
            ..MockBehavior::default()
        })
        .await;
        let app = test_app(upstream_config(upstream.addr));

        let encoded = target::encode_indirect("https://example.com/page");
        let response = app
            .oneshot(proxy_request(&format!("/lookup?url={encoded}")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            upstream.log.last_create_body.lock().unwrap().as_deref(),
            Some("http://example.com/page")
        );
        assert_eq!(
            upstream.log.last_rewritten.lock().unwrap().as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn indirect_lookup_without_parameter_is_malformed() {
        let upstream = spawn_upstream(MockBehavior::default()).await;
        let app = test_app(upstream_config(upstream.addr));

        let response = app.oneshot(proxy_request("/lookup")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(PROXY_HEADER).unwrap(),
            PROXY_HEADER_VALUE
        );
        assert_eq!(upstream.log.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn indirect_lookup_with_bad_base64_is_malformed() {
        let upstream = spawn_upstream(MockBehavior::default()).await;
        let app = test_app(upstream_config(upstream.addr));

        let response = app
            .oneshot(proxy_request("/lookup?url=%21%21%21"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(upstream.log.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_catch_all_target_is_malformed_before_any_upstream_call() {
        let upstream = spawn_upstream(MockBehavior::default()).await;
        let app = test_app(upstream_config(upstream.addr));

        let response = app.oneshot(proxy_request("/nodots")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(upstream.log.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn inbound_rewritten_header_is_forwarded_to_rs() {
        let upstream = spawn_upstream(MockBehavior {
            lookup_body: lookup_json(true, false, ""),
            ..MockBehavior::default()
        })
        .await;
        let app = test_app(upstream_config(upstream.addr));

        let request = Request::builder()
            .uri("http://example.com/page")
            .header(REWRITTEN_HEADER, "true")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            upstream.log.last_rewritten.lock().unwrap().as_deref(),
            Some("true")
        );
    }
}
