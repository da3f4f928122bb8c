//! HTTP client construction shared by the backend adapters

use reqwest::{Client, ClientBuilder};
use tracing::warn;

/// Build `builder`; a rejected configuration falls back to the default
/// client (no timeout, no user agent) and says so in the log.
pub fn build_client(builder: ClientBuilder, purpose: &str) -> Client {
    builder.build().unwrap_or_else(|e| {
        warn!(
            purpose,
            error = %e,
            "HTTP client configuration rejected, falling back to defaults"
        );
        Client::default()
    })
}
