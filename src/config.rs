//! Configuration types, loaded from the environment.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

pub const DEFAULT_ORIGIN: &str = "https://app.hey.com";
pub const DEFAULT_CABLE_URL: &str = "wss://app.hey.com/cable";
pub const DEFAULT_USER_AGENT: &str = "Hey Minion/1.0";
pub const DEFAULT_RETRY_INITIAL_MS: u64 = 100;

/// Everything the binary needs to run.
#[derive(Debug, Clone)]
pub struct MinionConfig {
    pub hey: HeyConfig,
    pub pushover: PushoverConfig,
    pub retry: RetryConfig,
    /// Per-read and per-send socket timeout. `None` waits indefinitely.
    pub socket_timeout: Option<Duration>,
}

/// Connection details for app.hey.com.
#[derive(Debug, Clone)]
pub struct HeyConfig {
    /// Raw `Cookie` header value from a signed-in browser session.
    pub cookie: SecretString,
    pub origin: String,
    pub cable_url: String,
    pub user_agent: String,
}

/// Pushover API credentials.
#[derive(Debug, Clone)]
pub struct PushoverConfig {
    pub user: SecretString,
    pub token: SecretString,
}

/// Reconnect backoff tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Delay before the first retry; doubled after each consecutive failure.
    pub initial_delay: Duration,
    /// Optional ceiling. `None` lets the delay grow without bound.
    pub max_delay: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(DEFAULT_RETRY_INITIAL_MS),
            max_delay: None,
        }
    }
}

impl MinionConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let hey = HeyConfig {
            cookie: SecretString::from(required("HEY_COOKIE")?),
            origin: lookup("HEY_ORIGIN")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_ORIGIN.to_string()),
            cable_url: lookup("HEY_CABLE_URL").unwrap_or_else(|| DEFAULT_CABLE_URL.to_string()),
            user_agent: lookup("HEY_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        };

        let pushover = PushoverConfig {
            user: SecretString::from(required("PUSHOVER_USER")?),
            token: SecretString::from(required("PUSHOVER_TOKEN")?),
        };

        let initial_ms = parse_u64(&lookup, "HEY_RETRY_INITIAL_MS")?
            .unwrap_or(DEFAULT_RETRY_INITIAL_MS);
        let retry = RetryConfig {
            initial_delay: Duration::from_millis(initial_ms),
            max_delay: parse_u64(&lookup, "HEY_RETRY_MAX_SECS")?.map(Duration::from_secs),
        };

        let socket_timeout = parse_u64(&lookup, "HEY_SOCKET_TIMEOUT_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self {
            hey,
            pushover,
            retry,
            socket_timeout,
        })
    }
}

fn parse_u64<F>(lookup: &F, key: &str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<MinionConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        MinionConfig::from_lookup(|key| map.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("HEY_COOKIE", "_haystack_session=abc"),
        ("PUSHOVER_USER", "u123"),
        ("PUSHOVER_TOKEN", "t456"),
    ];

    #[test]
    fn defaults_applied() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.hey.cookie.expose_secret(), "_haystack_session=abc");
        assert_eq!(config.hey.origin, DEFAULT_ORIGIN);
        assert_eq!(config.hey.cable_url, DEFAULT_CABLE_URL);
        assert_eq!(config.hey.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.retry.initial_delay, Duration::from_millis(100));
        assert!(config.socket_timeout.is_none());
    }

    #[test]
    fn missing_cookie_is_reported() {
        let err = load(&REQUIRED[1..]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "HEY_COOKIE"));
    }

    #[test]
    fn blank_pushover_token_counts_as_missing() {
        let mut vars = REQUIRED.to_vec();
        vars[2] = ("PUSHOVER_TOKEN", "   ");
        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "PUSHOVER_TOKEN"));
    }

    #[test]
    fn overrides_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("HEY_ORIGIN", "http://localhost:3000/"),
            ("HEY_CABLE_URL", "ws://localhost:3000/cable"),
            ("HEY_RETRY_INITIAL_MS", "250"),
            ("HEY_RETRY_MAX_SECS", "300"),
            ("HEY_SOCKET_TIMEOUT_SECS", "30"),
        ]);
        let config = load(&vars).unwrap();
        assert_eq!(config.hey.origin, "http://localhost:3000");
        assert_eq!(config.hey.cable_url, "ws://localhost:3000/cable");
        assert_eq!(config.retry.initial_delay, Duration::from_millis(250));
        assert_eq!(config.retry.max_delay, Some(Duration::from_secs(300)));
        assert_eq!(config.socket_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_socket_timeout_disables_it() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("HEY_SOCKET_TIMEOUT_SECS", "0"));
        assert!(load(&vars).unwrap().socket_timeout.is_none());
    }

    #[test]
    fn invalid_number_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("HEY_RETRY_INITIAL_MS", "soon"));
        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "HEY_RETRY_INITIAL_MS"));
    }
}
