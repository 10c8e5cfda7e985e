//! Authenticated HEY session, the facade the listener queries for state.

pub mod hey;

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::SessionError;

pub use hey::HeySession;

/// Identity of a sender awaiting screening, e.g. `"Jane Doe jane@example.com"`.
///
/// Normalization happens where the key is scraped; equality is exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SenderKey(String);

impl SenderKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SenderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-defined subscription topic, sent verbatim as the subscribe identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of everyone currently waiting in the screener.
pub type UnscreenedSet = HashSet<SenderKey>;

/// Handshake metadata for the streaming connection.
#[derive(Debug, Clone)]
pub struct Credential {
    pub cookie: SecretString,
    pub user_agent: String,
    pub origin: String,
}

/// What the listener needs from an authenticated session.
#[async_trait]
pub trait SessionFacade: Send + Sync {
    /// Full snapshot of the senders pending screening.
    async fn current_unscreened_senders(&self) -> Result<UnscreenedSet, SessionError>;

    /// Channels to subscribe to, in the order they should be subscribed.
    async fn subscription_channels(&self) -> Result<Vec<ChannelId>, SessionError>;

    /// Handshake credential for the streaming connection.
    fn connection_credential(&self) -> Credential;
}
