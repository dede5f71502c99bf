//! The interim "please wait" response.
//!
//! Served while a bundle is being prepared upstream. The template is read
//! per request so a missing or restored file takes effect without a restart;
//! a missing template degrades to a localized plain-text message rather than
//! an error.

use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use ceno_core::{ClientConfig, Messages};

use crate::state::AppState;

/// Renders the interim body for `url`. The second value is true when the
/// body is HTML and false for the plain-text fallback.
pub async fn please_wait(config: &ClientConfig, messages: &Messages, url: &str) -> (String, bool) {
    match tokio::fs::read_to_string(&config.please_wait_page).await {
        Ok(template) => {
            let body = template
                .replacen("{{.Paragraph1}}", messages.get("please_wait_p1_html"), 1)
                .replacen("{{.Paragraph2}}", messages.get("please_wait_p2_html"), 1)
                .replacen("{{.Redirect}}", url, 1);
            (body, true)
        }
        Err(e) => {
            debug!("interim template unavailable ({}), serving plain text", e);
            (messages.get("please_wait_txt").to_string(), false)
        }
    }
}

/// Writes the interim response with the matching content type.
pub async fn respond(state: &AppState, url: &str) -> Response {
    let (body, is_html) = please_wait(&state.config, &state.messages, url).await;
    let content_type = if is_html { "text/html" } else { "text/plain" };
    ([(CONTENT_TYPE, content_type)], body).into_response()
}
