//! Bundle lookup data model.
//!
//! [`LookupResult`] mirrors the JSON payload the LCS answers lookups with.
//! Missing fields decode to their zero values, so a sparse payload is still a
//! valid (empty) result; only genuinely malformed JSON is a decode failure.

use std::fmt;

use serde::Deserialize;

/// Closed set of error codes used by the resolution protocol.
///
/// Zero, or an absent code, means "no error". Codes outside this set arriving
/// from the LCS are treated as [`ErrorCode::FromLcs`] at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The requested URL failed decoding or validation. Never reaches
    /// upstream.
    MalformedUrl,
    /// The LCS is unreachable, timed out, or answered non-200. Also used
    /// when its payload was undecodable and even the decode-error report
    /// failed.
    NoConnectLcs,
    /// The LCS answered 200 but the payload did not decode, and the
    /// decode-error report went through. A bundle rebuild is assumed to fix
    /// it.
    MalformedLcsResponse,
    /// The LCS payload itself signaled an application-level error.
    FromLcs,
    /// The bundle-creation request could not be registered with the RS.
    NoConnectRs,
}

impl ErrorCode {
    /// Stable numeric code carried in [`LookupResult::err_code`].
    pub const fn code(self) -> u32 {
        match self {
            Self::MalformedUrl => 1100,
            Self::NoConnectLcs => 1101,
            Self::MalformedLcsResponse => 1102,
            Self::FromLcs => 1103,
            Self::NoConnectRs => 1104,
        }
    }

    /// Maps a numeric code back to its variant, if it is one of ours.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1100 => Some(Self::MalformedUrl),
            1101 => Some(Self::NoConnectLcs),
            1102 => Some(Self::MalformedLcsResponse),
            1103 => Some(Self::FromLcs),
            1104 => Some(Self::NoConnectRs),
            _ => None,
        }
    }

    /// Message key for this code, used for localization and logging.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MalformedUrl => "malformed_url",
            Self::NoConnectLcs => "no_connect_lcs",
            Self::MalformedLcsResponse => "malformed_lcs_response",
            Self::FromLcs => "from_lcs",
            Self::NoConnectRs => "no_connect_rs",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a bundle lookup against the LCS.
///
/// `bundle` is meaningful only when `err_code == 0 && complete && found`.
/// `complete == false` means the bundle is still being assembled upstream,
/// regardless of `found`. A result is created fresh per request and consumed
/// once by the classifier; nothing is shared across requests.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct LookupResult {
    #[serde(rename = "ErrCode", default)]
    pub err_code: u32,
    #[serde(rename = "ErrMsg", default)]
    pub err_msg: String,
    #[serde(rename = "Complete", default)]
    pub complete: bool,
    #[serde(rename = "Found", default)]
    pub found: bool,
    #[serde(rename = "Bundle", default)]
    pub bundle: String,
}

impl LookupResult {
    /// Builds a client-side result carrying only an error classification.
    pub fn from_error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            err_code: code.code(),
            err_msg: message.into(),
            ..Self::default()
        }
    }
}
