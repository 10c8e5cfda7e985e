//! HEY session over HTTP, authenticated with a browser cookie.
//!
//! app.hey.com exposes neither the screener contents nor the cable channel
//! names as JSON, so both are read out of the rendered pages.

use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, USER_AGENT};
use secrecy::ExposeSecret;
use tracing::{debug, info};

use crate::config::HeyConfig;
use crate::error::SessionError;
use crate::markup;
use crate::session::{ChannelId, Credential, SenderKey, SessionFacade, UnscreenedSet};

const SENDER_CLASS: &str = "clearance__sender";
const SUBSCRIPTION_CONTROLLER: &str = "page-update-subscription";
const CHANNEL_ATTRIBUTE: &str = "data-page-update-subscription-channel-value";

/// Cookie-authenticated client for app.hey.com.
pub struct HeySession {
    config: HeyConfig,
    client: reqwest::Client,
}

impl HeySession {
    pub fn new(config: HeyConfig) -> Result<Self, SessionError> {
        let mut headers = HeaderMap::new();
        let mut cookie = HeaderValue::from_str(config.cookie.expose_secret())
            .map_err(|e| SessionError::Http(format!("invalid cookie header: {e}")))?;
        cookie.set_sensitive(true);
        headers.insert(COOKIE, cookie);
        let agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| SessionError::Http(format!("invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, agent);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.origin)
    }

    async fn get_page(&self, path: &str) -> Result<reqwest::Response, SessionError> {
        let resp = self.client.get(self.url(path)).send().await?;
        let resp = resp.error_for_status()?;
        debug!(path, final_url = %resp.url(), "Fetched page");
        Ok(resp)
    }

    /// Confirm the cookie still signs us in.
    ///
    /// An expired session is redirected to the sign-in page instead of the app root.
    pub async fn verify(&self) -> Result<(), SessionError> {
        let resp = self.get_page("/").await?;
        if resp.url().path() != "/" {
            return Err(SessionError::Expired {
                location: resp.url().to_string(),
            });
        }
        info!(origin = %self.config.origin, "HEY session is signed in");
        Ok(())
    }
}

#[async_trait]
impl SessionFacade for HeySession {
    async fn current_unscreened_senders(&self) -> Result<UnscreenedSet, SessionError> {
        let body = self.get_page("/clearances").await?.text().await?;
        let senders = parse_unscreened_senders(&body);
        debug!(count = senders.len(), "Parsed screener snapshot");
        Ok(senders)
    }

    async fn subscription_channels(&self) -> Result<Vec<ChannelId>, SessionError> {
        let body = self.get_page("/").await?.text().await?;
        Ok(parse_subscription_channels(&body))
    }

    fn connection_credential(&self) -> Credential {
        Credential {
            cookie: self.config.cookie.clone(),
            user_agent: self.config.user_agent.clone(),
            origin: self.config.origin.clone(),
        }
    }
}

/// Senders listed on the screener page.
///
/// Each `<h3 class="clearance__sender">` holds the display name in its first
/// `<span>` and the address hint in its second. Only the hint is trimmed.
pub fn parse_unscreened_senders(html: &str) -> UnscreenedSet {
    markup::tags(html, "h3")
        .filter(|h3| h3.has_class(SENDER_CLASS))
        .filter_map(|h3| {
            let inner = markup::inner_html(html, &h3);
            let mut spans = markup::tags(inner, "span")
                .map(|span| markup::text(markup::inner_html(inner, &span)));
            let name = spans.next()?;
            let hint = spans.next()?;
            Some(SenderKey::new(format!("{name} {}", hint.trim())))
        })
        .collect()
}

/// Cable channel identifiers advertised by the app's `<meta>` tags, in page order.
pub fn parse_subscription_channels(html: &str) -> Vec<ChannelId> {
    markup::tags(html, "meta")
        .filter(|meta| meta.attr("data-controller") == Some(SUBSCRIPTION_CONTROLLER))
        .filter_map(|meta| meta.attr(CHANNEL_ATTRIBUTE).map(ChannelId::new))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEARANCES_PAGE: &str = r#"
        <html><body>
          <article class="clearance">
            <h3 class="clearance__sender">
              <span class="clearance__name">Jane Doe</span>
              <span class="clearance__email">
                jane@example.com
              </span>
            </h3>
          </article>
          <article class="clearance">
            <h3 class="clearance__sender"><span>Tom &amp; Co</span><span>hello@tom.co</span></h3>
          </article>
          <h3 class="other">Not a sender</h3>
        </body></html>
    "#;

    #[test]
    fn parses_sender_keys() {
        let senders = parse_unscreened_senders(CLEARANCES_PAGE);
        assert_eq!(senders.len(), 2);
        assert!(senders.contains(&SenderKey::new("Jane Doe jane@example.com")));
        assert!(senders.contains(&SenderKey::new("Tom & Co hello@tom.co")));
    }

    #[test]
    fn only_the_address_hint_is_trimmed() {
        let html = r#"<h3 class="clearance__sender"><span> Jane </span><span>
            jane@example.com </span></h3>"#;
        let senders = parse_unscreened_senders(html);
        assert!(senders.contains(&SenderKey::new(" Jane  jane@example.com")));
    }

    #[test]
    fn sender_heading_with_stimulus_actions() {
        let html = r#"<h3 data-action="click->clearance#open" class="clearance__sender"><span data-action="mouseenter->tip#show">Jane Doe</span><span>jane@example.com</span></h3>"#;
        let senders = parse_unscreened_senders(html);
        assert_eq!(senders.len(), 1);
        assert!(senders.contains(&SenderKey::new("Jane Doe jane@example.com")));
    }

    #[test]
    fn sender_heading_without_two_spans_is_skipped() {
        let html = r#"<h3 class="clearance__sender"><span>Lonely</span></h3>"#;
        assert!(parse_unscreened_senders(html).is_empty());
    }

    #[test]
    fn empty_screener_yields_empty_set() {
        assert!(parse_unscreened_senders("<html><body>All clear</body></html>").is_empty());
    }

    #[test]
    fn parses_channels_in_page_order() {
        let html = r#"
            <head>
              <meta name="csrf-token" content="abc">
              <meta data-controller="page-update-subscription"
                    data-page-update-subscription-channel-value="{&quot;channel&quot;:&quot;PageUpdatesChannel&quot;,&quot;box&quot;:&quot;imbox&quot;}">
              <meta data-controller="something-else" data-page-update-subscription-channel-value="nope">
              <meta data-page-update-subscription-channel-value='{"channel":"PageUpdatesChannel","box":"feed"}' data-controller="page-update-subscription">
            </head>
        "#;
        let channels = parse_subscription_channels(html);
        assert_eq!(
            channels,
            vec![
                ChannelId::new(r#"{"channel":"PageUpdatesChannel","box":"imbox"}"#),
                ChannelId::new(r#"{"channel":"PageUpdatesChannel","box":"feed"}"#),
            ]
        );
    }

    #[test]
    fn no_channels_is_valid() {
        assert!(parse_subscription_channels("<head></head>").is_empty());
    }
}
