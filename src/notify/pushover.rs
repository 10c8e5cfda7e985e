//! Pushover notifier — posts to the Pushover messages API.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::info;

use crate::config::PushoverConfig;
use crate::error::NotifyError;
use crate::notify::{Notification, Notifier};

const PUSHOVER_API: &str = "https://api.pushover.net/1";

pub struct PushoverNotifier {
    config: PushoverConfig,
    base_url: String,
    client: reqwest::Client,
}

impl PushoverNotifier {
    pub fn new(config: PushoverConfig) -> Self {
        Self::with_base_url(config, PUSHOVER_API)
    }

    /// Point at a different API root (used by tests and proxies).
    pub fn with_base_url(config: PushoverConfig, base_url: impl Into<String>) -> Self {
        Self {
            config,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    /// Check the user key and application token with Pushover.
    pub async fn validate(&self) -> Result<(), NotifyError> {
        let form = [
            ("token", self.config.token.expose_secret()),
            ("user", self.config.user.expose_secret()),
        ];
        let resp = self
            .client
            .post(self.api_url("users/validate.json"))
            .form(&form[..])
            .send()
            .await?;
        check_status(resp).await?;
        info!("Pushover credentials validated");
        Ok(())
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let form = [
            ("token", self.config.token.expose_secret()),
            ("user", self.config.user.expose_secret()),
            ("title", notification.title.as_str()),
            ("message", notification.message.as_str()),
        ];
        let resp = self
            .client
            .post(self.api_url("messages.json"))
            .form(&form[..])
            .send()
            .await?;
        check_status(resp).await
    }
}

async fn check_status(resp: reqwest::Response) -> Result<(), NotifyError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    Err(NotifyError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::extract::{Form, State};
    use axum::http::StatusCode;
    use axum::routing::post;
    use secrecy::SecretString;

    use super::*;

    type Captured = Arc<Mutex<Vec<Vec<(String, String)>>>>;

    fn config(token: &str) -> PushoverConfig {
        PushoverConfig {
            user: SecretString::from("user-key"),
            token: SecretString::from(token),
        }
    }

    async fn capture(
        State(seen): State<Captured>,
        Form(fields): Form<Vec<(String, String)>>,
    ) -> StatusCode {
        let ok = fields.iter().any(|(k, v)| k == "token" && v == "good");
        seen.lock().unwrap().push(fields);
        if ok { StatusCode::OK } else { StatusCode::BAD_REQUEST }
    }

    async fn start_api() -> (String, Captured) {
        let seen: Captured = Arc::default();
        let app = Router::new()
            .route("/1/messages.json", post(capture))
            .route("/1/users/validate.json", post(capture))
            .with_state(Arc::clone(&seen));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://127.0.0.1:{port}/1"), seen)
    }

    #[tokio::test]
    async fn notify_posts_title_and_message() {
        let (base, seen) = start_api().await;
        let notifier = PushoverNotifier::with_base_url(config("good"), base);

        notifier
            .notify(&Notification::new("2 senders to be screened", "Jane Doe jane@example.com"))
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let get = |key: &str| {
            seen[0]
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(get("title").as_deref(), Some("2 senders to be screened"));
        assert_eq!(get("message").as_deref(), Some("Jane Doe jane@example.com"));
        assert_eq!(get("user").as_deref(), Some("user-key"));
        assert_eq!(get("token").as_deref(), Some("good"));
    }

    #[tokio::test]
    async fn rejected_request_surfaces_status() {
        let (base, _seen) = start_api().await;
        let notifier = PushoverNotifier::with_base_url(config("bad"), base);

        let err = notifier.validate().await.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected { status: 400, .. }));
    }

    #[tokio::test]
    async fn validate_accepts_good_credentials() {
        let (base, seen) = start_api().await;
        let notifier = PushoverNotifier::with_base_url(config("good"), base);

        notifier.validate().await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
