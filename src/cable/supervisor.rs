//! Reconnect supervisor: keeps an [`EventSource`] connected forever.
//!
//! After every closure the supervisor sleeps for the current backoff delay,
//! doubles it, and tries again. A connection that got as far as the receive
//! loop resets the delay to zero, so a server bounced for a deploy is
//! reconnected to immediately.

use std::convert::Infallible;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::cable::{EventSource, MessageHandler};
use crate::config::RetryConfig;
use crate::error::StreamError;
use crate::session::ChannelId;

/// Doubling retry delay with no jitter.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Option<Duration>,
    current: Duration,
}

impl Backoff {
    pub fn new(config: &RetryConfig) -> Self {
        let mut backoff = Self {
            initial: config.initial_delay,
            max: config.max_delay,
            current: Duration::ZERO,
        };
        backoff.current = backoff.capped(config.initial_delay);
        backoff
    }

    /// The delay the next failure will wait.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Called once a connection is fully open.
    pub fn reset(&mut self) {
        self.current = Duration::ZERO;
    }

    /// Take the delay for this failure and double it for the next one.
    ///
    /// A zero delay (right after a reset) grows back from the initial delay.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let next = if delay.is_zero() {
            self.initial
        } else {
            delay.saturating_mul(2)
        };
        self.current = self.capped(next);
        delay
    }

    fn capped(&self, delay: Duration) -> Duration {
        match self.max {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}

/// Owns the connection, the channel list, and the message handler.
pub struct ReconnectSupervisor<S, H> {
    source: S,
    handler: H,
    channels: Vec<ChannelId>,
    backoff: Backoff,
    attempts: u64,
}

impl<S, H> ReconnectSupervisor<S, H>
where
    S: EventSource,
    H: MessageHandler,
{
    pub fn new(source: S, handler: H, channels: Vec<ChannelId>, retry: &RetryConfig) -> Self {
        Self {
            source,
            handler,
            channels,
            backoff: Backoff::new(retry),
            attempts: 0,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Reconnect until a local error makes further attempts pointless.
    pub async fn run_forever(mut self) -> Result<Infallible, StreamError> {
        loop {
            self.attempt().await?;
        }
    }

    /// One connection attempt plus the backoff sleep after it closes.
    ///
    /// Returns the delay that was slept.
    pub async fn attempt(&mut self) -> Result<Duration, StreamError> {
        self.attempts += 1;
        let closure = self
            .source
            .run(&self.channels, &mut self.handler)
            .await?;

        if closure.opened {
            self.backoff.reset();
        }

        if closure.reason.is_auth_rejection() {
            error!(
                attempt = self.attempts,
                reason = %closure.reason,
                "Cable handshake refused; the HEY session cookie has probably expired"
            );
        } else {
            warn!(
                attempt = self.attempts,
                opened = closure.opened,
                reason = %closure.reason,
                "Cable connection closed"
            );
        }

        let delay = self.backoff.next_delay();
        info!(delay_ms = millis(delay), "Reconnecting");
        tokio::time::sleep(delay).await;
        Ok(delay)
    }
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
