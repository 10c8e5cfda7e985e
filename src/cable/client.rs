//! One websocket connection to the HEY cable, from handshake to close.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use secrecy::ExposeSecret;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::{COOKIE, ORIGIN, USER_AGENT};
use tracing::{debug, info, trace, warn};

use crate::cable::frame::{InboundMessage, subscribe_frame};
use crate::cable::{CloseReason, Closure, EventSource, MessageHandler};
use crate::error::StreamError;
use crate::session::{ChannelId, Credential};

type Error = tokio_tungstenite::tungstenite::Error;

/// Websocket client for the HEY cable endpoint.
pub struct CableClient {
    url: String,
    credential: Credential,
    socket_timeout: Option<Duration>,
}

impl CableClient {
    pub fn new(url: impl Into<String>, credential: Credential) -> Self {
        Self {
            url: url.into(),
            credential,
            socket_timeout: None,
        }
    }

    /// Bound every connect, send, and read by `timeout`.
    pub fn with_socket_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.socket_timeout = timeout;
        self
    }

    fn handshake_request(&self) -> Result<Request, StreamError> {
        let mut request =
            self.url
                .as_str()
                .into_client_request()
                .map_err(|e| StreamError::InvalidUrl {
                    url: self.url.clone(),
                    reason: e.to_string(),
                })?;

        let headers = request.headers_mut();
        headers.insert(USER_AGENT, header_value("User-Agent", &self.credential.user_agent)?);
        headers.insert(ORIGIN, header_value("Origin", &self.credential.origin)?);
        let mut cookie = header_value("Cookie", self.credential.cookie.expose_secret())?;
        cookie.set_sensitive(true);
        headers.insert(COOKIE, cookie);

        Ok(request)
    }

    /// Pump frames until the connection ends.
    async fn receive_loop<S>(
        &self,
        ws: &mut S,
        handler: &mut dyn MessageHandler,
    ) -> CloseReason
    where
        S: futures::Stream<Item = Result<Message, Error>> + Unpin + Send,
    {
        loop {
            let frame = match bounded(self.socket_timeout, ws.next()).await {
                None => return CloseReason::Timeout,
                Some(None) => return CloseReason::PeerClosed,
                Some(Some(Err(e))) => return close_reason(e),
                Some(Some(Ok(frame))) => frame,
            };

            let text = match frame {
                Message::Text(text) => text.as_str().to_owned(),
                Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "Ignoring non-UTF-8 binary frame");
                        continue;
                    }
                },
                Message::Close(close) => {
                    debug!(?close, "Server sent close frame");
                    return CloseReason::PeerClosed;
                }
                // Websocket-level ping/pong is answered by tungstenite.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };

            match InboundMessage::decode(&text) {
                Ok(InboundMessage::Ping) => trace!("Cable ping"),
                Ok(msg) => handler.on_message(msg).await,
                Err(e) => warn!(
                    error = %e,
                    frame = %truncate(&text, 200),
                    "Ignoring malformed frame"
                ),
            }
        }
    }
}

#[async_trait]
impl EventSource for CableClient {
    async fn run(
        &mut self,
        channels: &[ChannelId],
        handler: &mut dyn MessageHandler,
    ) -> Result<Closure, StreamError> {
        let request = self.handshake_request()?;

        info!(url = %self.url, "Connecting");
        let mut ws = match bounded(self.socket_timeout, connect_async(request)).await {
            None => return Ok(Closure::before_open(CloseReason::Timeout)),
            Some(Err(Error::Url(e))) => {
                return Err(StreamError::InvalidUrl {
                    url: self.url.clone(),
                    reason: e.to_string(),
                });
            }
            Some(Err(e)) => return Ok(Closure::before_open(close_reason(e))),
            Some(Ok((ws, _response))) => ws,
        };
        info!(url = %self.url, "Connected");

        for channel in channels {
            info!(%channel, "Subscribing to channel");
            let frame = Message::Text(subscribe_frame(channel).into());
            match bounded(self.socket_timeout, ws.send(frame)).await {
                None => return Ok(Closure::before_open(CloseReason::Timeout)),
                Some(Err(e)) => return Ok(Closure::before_open(close_reason(e))),
                Some(Ok(())) => {}
            }
        }

        info!(channels = channels.len(), "Waiting for messages...");
        let reason = self.receive_loop(&mut ws, handler).await;
        Ok(Closure::after_open(reason))
    }
}

/// Await `fut`, giving up after `limit` if one is set. `None` means timed out.
async fn bounded<F: Future>(limit: Option<Duration>, fut: F) -> Option<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}

fn close_reason(e: Error) -> CloseReason {
    match e {
        Error::ConnectionClosed | Error::AlreadyClosed => CloseReason::PeerClosed,
        Error::Io(e) => CloseReason::Network(e.to_string()),
        Error::Http(resp) => CloseReason::Rejected {
            status: resp.status().as_u16(),
        },
        Error::Protocol(e) => CloseReason::Protocol(e.to_string()),
        other => CloseReason::Network(other.to_string()),
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, StreamError> {
    HeaderValue::from_str(value).map_err(|e| StreamError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn credential() -> Credential {
        Credential {
            cookie: SecretString::from("_haystack_session=abc; other=1"),
            user_agent: "Hey Minion/1.0".into(),
            origin: "https://app.hey.com".into(),
        }
    }

    #[test]
    fn handshake_carries_credential() {
        let client = CableClient::new("wss://app.hey.com/cable", credential());
        let request = client.handshake_request().unwrap();
        let headers = request.headers();
        assert_eq!(headers[USER_AGENT], "Hey Minion/1.0");
        assert_eq!(headers[ORIGIN], "https://app.hey.com");
        assert_eq!(headers[COOKIE], "_haystack_session=abc; other=1");
        assert!(headers[COOKIE].is_sensitive());
        assert_eq!(request.uri().path(), "/cable");
    }

    #[test]
    fn bad_url_is_unrecoverable() {
        let client = CableClient::new("not a url", credential());
        assert!(matches!(
            client.handshake_request(),
            Err(StreamError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn control_characters_in_cookie_are_rejected() {
        let mut cred = credential();
        cred.cookie = SecretString::from("bad\ncookie");
        let client = CableClient::new("wss://app.hey.com/cable", cred);
        assert!(matches!(
            client.handshake_request(),
            Err(StreamError::InvalidHeader { ref name, .. }) if name == "Cookie"
        ));
    }

    #[test]
    fn close_reasons_from_transport_errors() {
        assert_eq!(close_reason(Error::ConnectionClosed), CloseReason::PeerClosed);
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(close_reason(Error::Io(io)), CloseReason::Network(_)));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
