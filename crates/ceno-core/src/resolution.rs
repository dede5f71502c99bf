//! Response-classification state machine.
//!
//! Maps a [`LookupResult`] to exactly one of four actions. The mapping is
//! pure and keeps no state across calls: repeating the same lookup result
//! always yields the same action.

use crate::lookup::{ErrorCode, LookupResult};

/// Action to take for a classified lookup result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A complete bundle exists; write its content directly.
    Serve(String),
    /// Ask the RS to build a bundle, then show the interim page.
    RequestCreation,
    /// A build is already in progress upstream; show the interim page
    /// without re-requesting creation.
    Interim,
    /// Terminate the request with the error page for this code.
    Error(ErrorCode, String),
}

/// Classifies a lookup result. Rules are evaluated in order:
///
/// 1. malformed-LCS-response code → request creation (the stored bundle is
///    assumed corrupt, a rebuild is cheaper than surfacing the failure)
/// 2. any other nonzero code → error
/// 3. complete and found → serve the bundle content
/// 4. complete and not found → request creation
/// 5. not complete → interim page only
pub fn classify(result: &LookupResult) -> Resolution {
    if result.err_code == ErrorCode::MalformedLcsResponse.code() {
        return Resolution::RequestCreation;
    }
    if result.err_code != 0 {
        // Codes we did not synthesize ourselves come from the LCS payload.
        let code = ErrorCode::from_code(result.err_code).unwrap_or(ErrorCode::FromLcs);
        return Resolution::Error(code, result.err_msg.clone());
    }
    if !result.complete {
        return Resolution::Interim;
    }
    if result.found {
        Resolution::Serve(result.bundle.clone())
    } else {
        Resolution::RequestCreation
    }
}
