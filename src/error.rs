//! Error types for Hey Minion.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the authenticated HEY session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("HTTP error: {0}")]
    Http(String),

    /// The app redirected away from its root, so the cookie no longer works.
    #[error("Session expired (redirected to {location}); sign in again and refresh HEY_COOKIE")]
    Expired { location: String },

    #[error("Failed to parse page: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SessionError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

/// Push notification delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Notification rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

/// Unrecoverable local errors in the event stream client.
///
/// Transient failures (peer close, DNS, refused handshake) are not errors;
/// they come back as a [`crate::cable::CloseReason`].
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Invalid stream URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid handshake header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
