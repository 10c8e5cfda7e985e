//! Cable wire frames.
//!
//! Client → server: `{"command":"subscribe","identifier":"<channel>"}`.
//! Server → client: JSON objects; keepalives are `{"type":"ping",...}`,
//! page updates carry an HTML fragment in `message`.

use serde::Deserialize;

use crate::session::ChannelId;

/// Subscribe control frame for one channel.
pub fn subscribe_frame(channel: &ChannelId) -> String {
    serde_json::json!({
        "command": "subscribe",
        "identifier": channel.as_str(),
    })
    .to_string()
}

/// A decoded server frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Keepalive; never handed to the classifier.
    Ping,
    /// Page update with an HTML fragment.
    PageUpdate {
        identifier: Option<String>,
        message: String,
    },
    /// Welcome, subscription confirmations, and anything else without a fragment.
    Other { kind: Option<String> },
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: Option<String>,
    identifier: Option<String>,
    message: Option<serde_json::Value>,
}

impl InboundMessage {
    /// Decode a text frame. Fails if the payload is not a JSON object.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        let raw: RawFrame = serde_json::from_str(text)?;
        if raw.kind.as_deref() == Some("ping") {
            return Ok(Self::Ping);
        }
        Ok(match raw.message {
            Some(serde_json::Value::String(message)) => Self::PageUpdate {
                identifier: raw.identifier,
                message,
            },
            _ => Self::Other { kind: raw.kind },
        })
    }

    pub fn is_ping(&self) -> bool {
        matches!(self, Self::Ping)
    }

    /// The HTML fragment, if this frame carries one.
    pub fn fragment(&self) -> Option<&str> {
        match self {
            Self::PageUpdate { message, .. } => Some(message),
            _ => None,
        }
    }
}
