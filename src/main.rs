use std::sync::Arc;

use anyhow::Context;

use hey_minion::cable::{CableClient, ReconnectSupervisor};
use hey_minion::config::MinionConfig;
use hey_minion::notify::PushoverNotifier;
use hey_minion::screening::ScreeningClassifier;
use hey_minion::session::{HeySession, SessionFacade};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = MinionConfig::from_env().context("Failed to load configuration")?;

    eprintln!("📬 Hey Minion v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   HEY: {}", config.hey.origin);
    eprintln!("   Cable: {}", config.hey.cable_url);

    // ── HEY session ─────────────────────────────────────────────────────
    let session =
        Arc::new(HeySession::new(config.hey.clone()).context("Failed to build HEY client")?);
    session.verify().await.context("HEY session check failed")?;

    // ── Pushover ────────────────────────────────────────────────────────
    let notifier = Arc::new(PushoverNotifier::new(config.pushover.clone()));
    notifier
        .validate()
        .await
        .context("Pushover credentials were rejected")?;

    // Channels are fetched once and reused for every reconnect.
    let channels = session
        .subscription_channels()
        .await
        .context("Failed to read cable channels")?;
    let initial = session
        .current_unscreened_senders()
        .await
        .context("Failed to read the screener")?;
    eprintln!("   Channels: {}", channels.len());
    eprintln!("   Waiting in screener: {}\n", initial.len());

    let client = CableClient::new(config.hey.cable_url.clone(), session.connection_credential())
        .with_socket_timeout(config.socket_timeout);
    let classifier = ScreeningClassifier::new(session, notifier, initial);

    let supervisor = ReconnectSupervisor::new(client, classifier, channels, &config.retry);
    match supervisor.run_forever().await? {}
}
