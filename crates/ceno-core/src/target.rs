//! URL normalization for inbound targets.
//!
//! Targets arrive either directly (the catch-all path) or base64-encoded
//! under the `url` query parameter of the indirect `/lookup` endpoint, which
//! exists to sidestep browsers that aggressively force HTTPS redirects.
//! Normalization downgrades an HTTPS scheme to HTTP and records that it did.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Permissive "looks like a URL" guard. A cheap gate before any upstream
/// call, not RFC validation.
static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(https?://)?(www\.)?\w+\.\w+").expect("URL pattern is valid"));

/// Errors from decoding the indirect lookup parameter. All of these classify
/// as a malformed URL at the HTTP boundary.
#[derive(Debug, Error)]
pub enum TargetError {
    /// The query string carried no `url` parameter.
    #[error("query string has no url parameter")]
    MissingParam,

    /// The parameter was not valid base64.
    #[error("url parameter is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// The decoded bytes were not valid UTF-8.
    #[error("decoded url is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// A normalized target URL plus whether this proxy downgraded its scheme.
///
/// `was_rewritten` distinguishes "this proxy rewrote HTTPS to HTTP" from
/// "the request arrived already downgraded by an intermediary".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub url: String,
    pub was_rewritten: bool,
}

/// Decodes the base64-encoded `url` parameter of the indirect endpoint.
pub fn decode_indirect(param: &str) -> Result<String, TargetError> {
    let bytes = BASE64.decode(param)?;
    Ok(String::from_utf8(bytes)?)
}

/// Inverse of [`decode_indirect`]; also used to embed a target in the LCS
/// lookup query.
pub fn encode_indirect(url: &str) -> String {
    BASE64.encode(url)
}

/// Downgrades an `https` scheme to `http`. Returns the (possibly rewritten)
/// URL and whether the downgrade happened.
pub fn strip_https(url: &str) -> (String, bool) {
    if url.starts_with("https") {
        (url.replacen("https", "http", 1), true)
    } else {
        (url.to_string(), false)
    }
}

/// Canonicalizes a raw target URL.
pub fn normalize(raw: &str) -> Target {
    let (url, was_rewritten) = strip_https(raw);
    Target { url, was_rewritten }
}

/// Syntactic well-formedness guard for a normalized target.
pub fn is_valid_url(url: &str) -> bool {
    URL_PATTERN.is_match(url)
}
