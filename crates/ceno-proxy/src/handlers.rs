//! Inbound request handlers.
//!
//! Two entry points feed one shared resolution path: the indirect `/lookup`
//! endpoint (base64-encoded target) and the catch-all, where the full
//! requested URI is the target. The path is: validate, look up, classify,
//! act. A single request never loops; retrying is the client's own refresh.

use std::collections::HashMap;

use axum::extract::{OriginalUri, Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Response};
use tracing::{info, warn};

use ceno_core::target::{self, Target};
use ceno_core::{classify, ErrorCode, Resolution};

use crate::error::render_error;
use crate::interim;
use crate::state::AppState;
use crate::REWRITTEN_HEADER;

/// GET /lookup?url=<base64-of-target>.
///
/// Exists so browsers that force HTTPS upgrades can hand us a target without
/// redirect loops. Decodes and normalizes the parameter, then joins the same
/// path as the catch-all.
pub async fn direct_lookup(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let Some(encoded) = params.get("url") else {
        return render_error(
            ErrorCode::MalformedUrl,
            state.messages.get("query_no_url"),
            &state.messages,
        );
    };
    let decoded = match target::decode_indirect(encoded) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("rejected indirect lookup parameter: {}", e);
            return render_error(
                ErrorCode::MalformedUrl,
                state.messages.get("url_b64"),
                &state.messages,
            );
        }
    };

    let Target { url, was_rewritten } = target::normalize(&decoded);
    // An intermediary (the browser extension, typically) may have downgraded
    // the scheme before the request reached us.
    let was_rewritten = was_rewritten || rewritten_header(&headers);
    resolve(&state, &url, was_rewritten).await
}

/// Catch-all: any method, any path. The full requested URI is the target.
pub async fn resolve_any(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    let url = uri.to_string();
    resolve(&state, &url, rewritten_header(&headers)).await
}

fn rewritten_header(headers: &HeaderMap) -> bool {
    headers
        .get(REWRITTEN_HEADER)
        .and_then(|value| value.to_str().ok())
        == Some("true")
}

/// Shared resolution path.
async fn resolve(state: &AppState, url: &str, was_rewritten: bool) -> Response {
    info!(url, rewritten = was_rewritten, "resolving bundle request");

    if !target::is_valid_url(url) {
        let detail = state.messages.format("malformed_url", &[("url", url)]);
        return render_error(ErrorCode::MalformedUrl, &detail, &state.messages);
    }

    let result = state.upstream.lookup(url).await;
    match classify(&result) {
        Resolution::Serve(bundle) => Html(bundle).into_response(),
        Resolution::RequestCreation => try_request_bundle(state, url, was_rewritten).await,
        Resolution::Interim => interim::respond(state, url).await,
        Resolution::Error(code, message) => {
            warn!(code = %code, "lookup failed: {}", message);
            let detail = state
                .messages
                .format(code.as_str(), &[("message", &message), ("url", url)]);
            render_error(code, &detail, &state.messages)
        }
    }
}

/// Registers a creation request, then shows the interim page.
///
/// A transport failure here is fatal for this request cycle: showing the
/// interim page anyway would have the user wait for a rebuild that was never
/// registered.
async fn try_request_bundle(state: &AppState, url: &str, was_rewritten: bool) -> Response {
    match state.upstream.request_new_bundle(url, was_rewritten).await {
        Ok(()) => interim::respond(state, url).await,
        Err(e) => {
            warn!("bundle creation request failed: {}", e);
            let detail = state
                .messages
                .format("no_connect_rs", &[("message", &e.to_string())]);
            render_error(ErrorCode::NoConnectRs, &detail, &state.messages)
        }
    }
}
