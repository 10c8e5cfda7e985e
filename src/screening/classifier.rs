//! Screening classifier — turns cable page updates into push notifications.
//!
//! HEY re-renders the clearances button whenever the screener changes. When a
//! page update contains it, the classifier re-reads the screener, diffs it
//! against the last snapshot, and notifies about one newcomer. A burst of
//! several newcomers in one update still produces a single notification.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::cable::{InboundMessage, MessageHandler};
use crate::markup;
use crate::notify::{Notification, Notifier};
use crate::screening::dedup::DedupStore;
use crate::session::{SessionFacade, UnscreenedSet};

/// Element id of the screener button in HEY's page updates.
pub const CLEARANCES_MARKER_ID: &str = "clearances_button";

/// What to do with an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Ignore,
    ScreeningCandidateDetected,
}

/// Decide whether a frame signals a change in the screener.
pub fn classify(msg: &InboundMessage) -> Action {
    match msg.fragment() {
        Some(fragment) if markup::has_element_with_id(fragment, CLEARANCES_MARKER_ID) => {
            Action::ScreeningCandidateDetected
        }
        _ => Action::Ignore,
    }
}

/// "1 sender to be screened", "3 senders to be screened".
pub fn screening_title(total: usize) -> String {
    let plural = if total == 1 { "" } else { "s" };
    format!("{total} sender{plural} to be screened")
}

/// Owns the dedup store and reacts to screener changes.
pub struct ScreeningClassifier {
    session: Arc<dyn SessionFacade>,
    notifier: Arc<dyn Notifier>,
    store: DedupStore,
}

impl ScreeningClassifier {
    pub fn new(
        session: Arc<dyn SessionFacade>,
        notifier: Arc<dyn Notifier>,
        initial: UnscreenedSet,
    ) -> Self {
        Self {
            session,
            notifier,
            store: DedupStore::new(initial),
        }
    }

    pub fn store(&self) -> &DedupStore {
        &self.store
    }

    /// Classify one frame and act on it. Returns the notification sent, if any.
    pub async fn process(&mut self, msg: &InboundMessage) -> Option<Notification> {
        match classify(msg) {
            Action::Ignore => None,
            Action::ScreeningCandidateDetected => {
                debug!("Clearances button in page update; refreshing screener");
                self.refresh().await
            }
        }
    }

    /// Re-read the screener and notify about one newcomer, if there is one.
    async fn refresh(&mut self) -> Option<Notification> {
        let fresh = match self.session.current_unscreened_senders().await {
            Ok(fresh) => fresh,
            Err(e) => {
                error!(error = %e, "Failed to refresh screener; keeping previous snapshot");
                return None;
            }
        };

        let total = fresh.len();
        let added = self.store.replace(fresh);
        // Any newcomer will do; the set has no order.
        let sender = added.into_iter().next()?;

        let notification = Notification::new(screening_title(total), sender.to_string());
        info!(
            title = %notification.title,
            sender = %notification.message,
            "Sending screening notification"
        );
        if let Err(e) = self.notifier.notify(&notification).await {
            warn!(error = %e, "Notification delivery failed");
        }
        Some(notification)
    }
}

#[async_trait]
impl MessageHandler for ScreeningClassifier {
    async fn on_message(&mut self, msg: InboundMessage) {
        self.process(&msg).await;
    }
}
