//! Shared application state for the proxy.

use std::sync::Arc;

use ceno_core::{ClientConfig, Messages};

use crate::upstream::UpstreamClient;

/// State injected into every handler.
///
/// Everything here is built once at startup and only read afterwards; a
/// request path never writes to it, so requests share nothing mutable.
#[derive(Clone)]
pub struct AppState {
    /// Immutable process configuration.
    pub config: Arc<ClientConfig>,
    /// Localized user-facing strings.
    pub messages: Arc<Messages>,
    /// Client for the LCS and RS exchanges.
    pub upstream: Arc<UpstreamClient>,
}

impl AppState {
    /// Builds the state, including the upstream HTTP client with the
    /// configured timeout.
    pub fn new(config: ClientConfig, messages: Messages) -> Result<Self, reqwest::Error> {
        let config = Arc::new(config);
        let messages = Arc::new(messages);
        let upstream = Arc::new(UpstreamClient::new(config.clone(), messages.clone())?);
        Ok(Self {
            config,
            messages,
            upstream,
        })
    }
}
