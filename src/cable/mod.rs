//! HEY cable: the long-lived streaming connection and its reconnect loop.

pub mod client;
pub mod frame;
pub mod supervisor;

use std::fmt;

use async_trait::async_trait;

use crate::error::StreamError;
use crate::session::ChannelId;

pub use client::CableClient;
pub use frame::InboundMessage;
pub use supervisor::{Backoff, ReconnectSupervisor};

/// Why a connection attempt ended. Every reason is retryable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The server closed the socket, e.g. during a deploy.
    PeerClosed,
    /// DNS failure, refused or reset connection, TLS failure.
    Network(String),
    /// The server answered the upgrade request with an HTTP error.
    Rejected { status: u16 },
    /// The peer broke the websocket protocol.
    Protocol(String),
    /// A read, send, or connect exceeded the configured socket timeout.
    Timeout,
}

impl CloseReason {
    /// 401/403 on the upgrade usually means the session cookie expired.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Rejected { status: 401 | 403 })
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => f.write_str("closed by server"),
            Self::Network(reason) => write!(f, "network error: {reason}"),
            Self::Rejected { status } => write!(f, "handshake rejected with HTTP {status}"),
            Self::Protocol(reason) => write!(f, "protocol error: {reason}"),
            Self::Timeout => f.write_str("socket timed out"),
        }
    }
}

/// How a single connection attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Closure {
    /// True once every subscribe frame was sent and the receive loop started.
    pub opened: bool,
    pub reason: CloseReason,
}

impl Closure {
    pub fn before_open(reason: CloseReason) -> Self {
        Self {
            opened: false,
            reason,
        }
    }

    pub fn after_open(reason: CloseReason) -> Self {
        Self {
            opened: true,
            reason,
        }
    }
}

/// Receives every non-keepalive frame, one at a time.
///
/// The stream is not read again until `on_message` returns.
#[async_trait]
pub trait MessageHandler: Send {
    async fn on_message(&mut self, msg: InboundMessage);
}

/// One connection attempt: connect, subscribe, then pump frames until closed.
#[async_trait]
pub trait EventSource: Send {
    /// Returns `Err` only for local errors that retrying cannot fix.
    async fn run(
        &mut self,
        channels: &[ChannelId],
        handler: &mut dyn MessageHandler,
    ) -> Result<Closure, StreamError>;
}
