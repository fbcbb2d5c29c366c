//! Owner notification dispatcher.
//!
//! [`NotificationDispatcher`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and, for every owner notification request, writes the ledger entry for
//! `(project, kind)` if it does not exist yet, then delivers it. Repeated
//! requests for the same pair stop at the ledger. Every send happens under
//! the entry's claim, so the dispatcher and the retrier never deliver one
//! entry at the same time. Together these make delivery at-most-once.
//!
//! With a [`Mailer`] configured, entries use the `email` channel and are sent
//! with exponential-backoff retry (1 s, 2 s, 4 s). Without one they use the
//! `in_app` channel and are delivered as soon as they are recorded.

use std::sync::Arc;
use std::time::Duration;

use crowdfund_core::channels::{CHANNEL_EMAIL, CHANNEL_IN_APP};
use crowdfund_core::funding::{NotificationKind, OwnerNotification};
use crowdfund_core::types::DbId;
use crowdfund_db::models::notification::ProjectNotification;
use crowdfund_db::repositories::{ProjectNotificationRepo, ProjectRepo, UserRepo};
use crowdfund_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::PlatformEvent;
use crate::delivery::{EmailMessage, Mailer};
use crate::notifier::from_event;

/// Retry delays between email attempts (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// How long a claim protects an entry. Must outlast one full delivery,
/// backoff included; an older claim is treated as abandoned.
const DEFAULT_CLAIM_LEASE: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// Error / outcome
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Project {0} not found")]
    MissingProject(DbId),

    #[error("Recipient user {0} not found")]
    MissingRecipient(DbId),

    #[error("Unknown notification kind '{0}'")]
    UnknownKind(String),
}

/// What happened to one request or delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The pair was already in the ledger; nothing was sent.
    Duplicate,
    /// Another sender holds the entry's claim; nothing was sent.
    InFlight,
    /// Delivered and marked as such.
    Delivered,
    /// All attempts failed; the failure is recorded for the retrier.
    Failed,
}

// ---------------------------------------------------------------------------
// NotificationDispatcher
// ---------------------------------------------------------------------------

pub struct NotificationDispatcher {
    pool: DbPool,
    mailer: Option<Arc<dyn Mailer>>,
    retry_delays: Vec<Duration>,
    claim_lease: Duration,
}

impl NotificationDispatcher {
    /// Create a dispatcher. `mailer` is `None` when SMTP is not configured.
    pub fn new(pool: DbPool, mailer: Option<Arc<dyn Mailer>>) -> Self {
        Self {
            pool,
            mailer,
            retry_delays: RETRY_DELAYS.to_vec(),
            claim_lease: DEFAULT_CLAIM_LEASE,
        }
    }

    /// Override the backoff schedule between email attempts.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    pub fn with_claim_lease(mut self, lease: Duration) -> Self {
        self.claim_lease = lease;
        self
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Run the dispatch loop.
    ///
    /// Exits when the channel is closed (i.e. the bus is dropped).
    pub async fn run(&self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let Some(notification) = from_event(&event) else {
                        continue;
                    };
                    if let Err(e) = self.handle(notification).await {
                        tracing::error!(
                            project_id = notification.project_id,
                            kind = %notification.kind,
                            error = %e,
                            "Failed to dispatch owner notification"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Skipped requests are recovered on the next save that
                    // finds the goal reached.
                    tracing::warn!(skipped = n, "Notification dispatcher lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification dispatcher shutting down");
                    break;
                }
            }
        }
    }

    /// Record `notification` once and deliver it.
    ///
    /// A freshly recorded entry is already claimed by this call.
    pub async fn handle(
        &self,
        notification: OwnerNotification,
    ) -> Result<DispatchOutcome, DispatchError> {
        let channel = if self.mailer.is_some() {
            CHANNEL_EMAIL
        } else {
            CHANNEL_IN_APP
        };

        let created = ProjectNotificationRepo::create_once(
            &self.pool,
            notification.project_id,
            notification.owner_id,
            notification.kind.as_str(),
            channel,
        )
        .await?;

        match created {
            Some(entry) => {
                tracing::info!(
                    notification_id = entry.id,
                    project_id = entry.project_id,
                    channel,
                    "Owner notification recorded"
                );
                self.deliver(&entry).await
            }
            None => {
                tracing::debug!(
                    project_id = notification.project_id,
                    kind = %notification.kind,
                    "Owner notification already recorded, skipping"
                );
                Ok(DispatchOutcome::Duplicate)
            }
        }
    }

    /// Claim an existing ledger entry and deliver it.
    ///
    /// Used by the retrier. Returns [`DispatchOutcome::InFlight`] when the
    /// entry is held by another sender or was delivered in the meantime.
    pub async fn redeliver(
        &self,
        entry: &ProjectNotification,
    ) -> Result<DispatchOutcome, DispatchError> {
        match ProjectNotificationRepo::claim(&self.pool, entry.id, self.claim_lease).await? {
            Some(claimed) => self.deliver(&claimed).await,
            None => {
                tracing::debug!(
                    notification_id = entry.id,
                    "Owner notification claimed elsewhere, skipping"
                );
                Ok(DispatchOutcome::InFlight)
            }
        }
    }

    /// Deliver one claimed ledger entry over its channel, recording the result.
    async fn deliver(
        &self,
        entry: &ProjectNotification,
    ) -> Result<DispatchOutcome, DispatchError> {
        if entry.channel == CHANNEL_IN_APP {
            ProjectNotificationRepo::mark_delivered(&self.pool, entry.id).await?;
            return Ok(DispatchOutcome::Delivered);
        }

        let Some(mailer) = &self.mailer else {
            ProjectNotificationRepo::record_failure(
                &self.pool,
                entry.id,
                "email delivery is not configured",
            )
            .await?;
            return Ok(DispatchOutcome::Failed);
        };

        let message = match self.render(entry).await {
            Ok(message) => message,
            Err(e) => {
                ProjectNotificationRepo::record_failure(&self.pool, entry.id, &e.to_string())
                    .await?;
                return Err(e);
            }
        };

        match self.send_with_retry(mailer.as_ref(), &message).await {
            Ok(()) => {
                ProjectNotificationRepo::mark_delivered(&self.pool, entry.id).await?;
                Ok(DispatchOutcome::Delivered)
            }
            Err(error) => {
                tracing::error!(
                    notification_id = entry.id,
                    error = %error,
                    "Owner notification email failed after all retries"
                );
                ProjectNotificationRepo::record_failure(&self.pool, entry.id, &error).await?;
                Ok(DispatchOutcome::Failed)
            }
        }
    }

    async fn render(&self, entry: &ProjectNotification) -> Result<EmailMessage, DispatchError> {
        let kind: NotificationKind = entry
            .kind
            .parse()
            .map_err(|_| DispatchError::UnknownKind(entry.kind.clone()))?;
        let owner = UserRepo::find_by_id(&self.pool, entry.user_id)
            .await?
            .ok_or(DispatchError::MissingRecipient(entry.user_id))?;
        let project = ProjectRepo::find_by_id(&self.pool, entry.project_id)
            .await?
            .ok_or(DispatchError::MissingProject(entry.project_id))?;

        Ok(EmailMessage::for_owner(
            kind,
            &owner.email,
            &owner.name,
            &project.name,
        ))
    }

    /// Send with the configured backoff, returning the final error message.
    async fn send_with_retry(
        &self,
        mailer: &dyn Mailer,
        message: &EmailMessage,
    ) -> Result<(), String> {
        for (attempt, delay) in self.retry_delays.iter().enumerate() {
            match mailer.send(message).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        to = %message.to,
                        error = %e,
                        "Email delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(*delay).await;
                }
            }
        }

        // Final attempt after the last backoff.
        match mailer.send(message).await {
            Ok(()) => Ok(()),
            Err(e) => Err(e.to_string()),
        }
    }
}
