//! Credential boundary and endpoint URL construction
//!
//! The token subsystem is an external collaborator: the client only sees an
//! async provider returning the current credential or `None`. `None` means
//! "cannot connect yet", not an error; the client stays idle and the caller
//! retries once authenticated.

use async_trait::async_trait;
use url::Url;

use crate::infrastructure::config::RealtimeConfig;
use crate::{RealtimeError, Result};

/// WebSocket endpoint path on the backend
pub const WS_PATH: &str = "/api/v1/ws";

/// Source of the connection credential
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current credential, or `None` when not authenticated yet
    async fn token(&self) -> Option<String>;
}

/// Fixed-token provider for tools and tests
pub struct StaticToken(Option<String>);

impl StaticToken {
    /// Provider that always yields the given token
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    /// Provider that never yields a token
    pub fn none() -> Self {
        Self(None)
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Build the connection URL with the credential as a query parameter
///
/// Scheme mirrors the hosting context: `wss` when the app is served
/// securely, `ws` otherwise. The token is percent-encoded by the URL
/// builder, never concatenated raw.
pub fn build_ws_url(config: &RealtimeConfig, token: &str) -> Result<Url> {
    let scheme = if config.connection.secure { "wss" } else { "ws" };
    let base = format!("{}://{}{}", scheme, config.connection.host, WS_PATH);

    let mut url = Url::parse(&base)
        .map_err(|e| RealtimeError::Config(format!("bad endpoint '{}': {}", base, e)))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}
