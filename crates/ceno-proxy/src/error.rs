//! Error-code to error-page dispatch.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use ceno_core::{ErrorCode, Messages};

/// Renders the user-visible error page for `code` and terminates the
/// request.
///
/// The match is exhaustive: every code maps to exactly one page, and a new
/// variant cannot be swallowed by a default arm. `detail` is the localized,
/// human-readable cause assembled by the caller.
pub fn render_error(code: ErrorCode, detail: &str, messages: &Messages) -> Response {
    let status = match code {
        ErrorCode::MalformedUrl => StatusCode::BAD_REQUEST,
        ErrorCode::NoConnectLcs => StatusCode::BAD_GATEWAY,
        // Never dispatched in practice: the classifier converts this code
        // into a creation request instead of an error page.
        ErrorCode::MalformedLcsResponse => StatusCode::BAD_GATEWAY,
        ErrorCode::FromLcs => StatusCode::BAD_GATEWAY,
        ErrorCode::NoConnectRs => StatusCode::BAD_GATEWAY,
    };

    let title = messages.get("error_page_title");
    let body = format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n<p>{detail}</p>\n</body>\n</html>\n"
    );
    (status, Html(body)).into_response()
}
