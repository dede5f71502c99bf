//! Localized user-facing strings.
//!
//! The deployment ships `translations/<language>.json` files mapping message
//! keys to localized text. A provider is resolved once at startup from the
//! `LANGUAGE` environment variable and injected into every component that
//! renders user text. Any key missing from the loaded file falls back to the
//! built-in English string, so rendering never fails because a translation
//! is absent.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

/// Built-in English strings, the fallback for every key.
const DEFAULTS: &[(&str, &str)] = &[
    (
        "please_wait_txt",
        "The page you requested is being prepared. Please refresh or retry in a couple of minutes.",
    ),
    (
        "please_wait_p1_html",
        "The page you requested is being retrieved through the CENO network.",
    ),
    (
        "please_wait_p2_html",
        "This can take a little while. Refresh this page in a couple of minutes to see the result.",
    ),
    ("malformed_url", "The requested URL {url} is not valid."),
    (
        "query_no_url",
        "The lookup query string did not contain a url parameter.",
    ),
    (
        "url_b64",
        "The url parameter could not be decoded as base64.",
    ),
    (
        "no_connect_lcs",
        "Could not reach the lookup server: {message}",
    ),
    (
        "no_reach_lcs",
        "The lookup server could not be reached to report a malformed response.",
    ),
    ("from_lcs", "The lookup server reported an error: {message}"),
    (
        "no_connect_rs",
        "Could not ask for the page to be prepared: {message}",
    ),
    (
        "malformed_lcs_response",
        "The lookup server returned a malformed response: {message}",
    ),
    ("error_page_title", "CENO could not complete your request"),
];

/// Message provider resolved once at startup.
#[derive(Debug, Clone)]
pub struct Messages {
    strings: HashMap<String, String>,
}

impl Messages {
    /// Built-in English strings only.
    pub fn builtin() -> Self {
        let strings = DEFAULTS
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Self { strings }
    }

    /// Loads `<dir>/<language>.json` over the built-ins. A missing or
    /// unreadable file degrades to the built-in strings.
    pub fn load(dir: &Path, language: &str) -> Self {
        let mut messages = Self::builtin();
        let path = dir.join(format!("{language}.json"));
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!("no translation file at {:?} ({}), using built-ins", path, e);
                return messages;
            }
        };
        match serde_json::from_str::<HashMap<String, String>>(&content) {
            Ok(loaded) => {
                messages.strings.extend(loaded);
            }
            Err(e) => {
                warn!("could not parse translation file {:?}: {}", path, e);
            }
        }
        messages
    }

    /// Resolves the language from the `LANGUAGE` environment variable,
    /// defaulting to `en-us`.
    pub fn from_env(dir: &Path) -> Self {
        let language = std::env::var("LANGUAGE").unwrap_or_else(|_| "en-us".to_string());
        Self::load(dir, &language)
    }

    /// Looks up a message template by key. Unknown keys echo the key itself
    /// so a typo is visible rather than silent.
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        match self.strings.get(key) {
            Some(value) => value,
            None => key,
        }
    }

    /// Looks up a template and substitutes `{name}` placeholders.
    pub fn format(&self, key: &str, replacements: &[(&str, &str)]) -> String {
        let mut text = self.get(key).to_string();
        for (name, value) in replacements {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }
}
