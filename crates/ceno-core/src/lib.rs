//! CENO Core - resolution protocol logic for the CENO client proxy.
//!
//! This crate holds everything about the resolution protocol that does not
//! touch a socket: the lookup data model, the response-classification state
//! machine, URL normalization, localized user-facing strings, and the
//! process-wide configuration type. The HTTP surface and the upstream
//! exchanges live in `ceno-proxy`.

pub mod config;
pub mod lookup;
pub mod messages;
pub mod resolution;
pub mod target;

pub use config::ClientConfig;
pub use lookup::{ErrorCode, LookupResult};
pub use messages::Messages;
pub use resolution::{classify, Resolution};
