//! Outbound exchanges with the LCS and RS.
//!
//! Three wire contracts live here: the bundle lookup (GET, JSON response),
//! the bundle-creation trigger (POST, response ignored), and the best-effort
//! decode-failure report (POST JSON, reached iff 200). Each call is
//! independent and carries no state linking one request to another.

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{debug, warn};

use ceno_core::{target, ClientConfig, ErrorCode, LookupResult, Messages};

use crate::REWRITTEN_HEADER;

/// Client for the LCS and RS exchanges. Holds one `reqwest::Client` with the
/// configured per-request timeout.
pub struct UpstreamClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    messages: Arc<Messages>,
}

impl UpstreamClient {
    pub fn new(config: Arc<ClientConfig>, messages: Arc<Messages>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout())
            .build()?;
        Ok(Self {
            http,
            config,
            messages,
        })
    }

    /// Queries the LCS for a ready bundle. Always yields a result, never
    /// drops the request:
    ///
    /// - connection failure, timeout or non-200 → `NoConnectLcs`
    /// - 200 but undecodable payload → report the decode failure; if the
    ///   report is reached → `MalformedLcsResponse`, otherwise
    ///   `NoConnectLcs`
    /// - decodable payload → returned verbatim
    pub async fn lookup(&self, url: &str) -> LookupResult {
        let encoded = target::encode_indirect(url);
        let request = self
            .http
            .get(&self.config.lcs_lookup_endpoint)
            .query(&[("url", encoded.as_str())]);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("LCS lookup failed: {}", e);
                return LookupResult::from_error(ErrorCode::NoConnectLcs, e.to_string());
            }
        };
        if response.status() != StatusCode::OK {
            warn!("LCS lookup answered with status {}", response.status());
            return LookupResult::from_error(
                ErrorCode::NoConnectLcs,
                format!("lookup server answered with status {}", response.status()),
            );
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("could not read LCS response body: {}", e);
                return LookupResult::from_error(ErrorCode::NoConnectLcs, e.to_string());
            }
        };
        match serde_json::from_str::<LookupResult>(&body) {
            Ok(result) => result,
            Err(e) => {
                warn!("could not decode LCS response: {}", e);
                if self.report_decode_error(&e.to_string()).await {
                    LookupResult::from_error(ErrorCode::MalformedLcsResponse, e.to_string())
                } else {
                    // Even error reporting failed; the LCS is unreachable for
                    // practical purposes.
                    LookupResult::from_error(
                        ErrorCode::NoConnectLcs,
                        self.messages.get("no_reach_lcs"),
                    )
                }
            }
        }
    }

    /// Asks the RS to build a bundle for `url`. The response body is ignored
    /// by design; only transport failure is observed.
    pub async fn request_new_bundle(
        &self,
        url: &str,
        was_rewritten: bool,
    ) -> Result<(), reqwest::Error> {
        let rewritten = if was_rewritten { "true" } else { "false" };
        self.http
            .post(&self.config.rs_create_endpoint)
            .header(CONTENT_TYPE, "text/plain")
            .header(REWRITTEN_HEADER, rewritten)
            .body(url.to_string())
            .send()
            .await?;
        Ok(())
    }

    /// Best-effort decode-failure report to the LCS. The LCS counts as
    /// reached iff it answers exactly 200.
    pub async fn report_decode_error(&self, message: &str) -> bool {
        let payload = serde_json::json!({ "error": message });
        match self
            .http
            .post(&self.config.decode_error_endpoint)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                debug!("decode-error report failed: {}", e);
                false
            }
        }
    }
}
