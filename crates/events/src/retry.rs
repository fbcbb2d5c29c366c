//! Periodic re-delivery of failed owner notifications.

use std::sync::Arc;
use std::time::Duration;

use crowdfund_db::repositories::ProjectNotificationRepo;
use tokio_util::sync::CancellationToken;

use crate::dispatch::{DispatchOutcome, NotificationDispatcher};

/// Entries that failed this many times are left for manual follow-up.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;

/// Entries re-attempted per tick.
const BATCH_SIZE: i64 = 100;

/// Background service re-attempting undelivered ledger entries.
pub struct NotificationRetrier {
    dispatcher: Arc<NotificationDispatcher>,
    interval: Duration,
    max_attempts: i32,
}

impl NotificationRetrier {
    pub fn new(dispatcher: Arc<NotificationDispatcher>, interval: Duration) -> Self {
        Self {
            dispatcher,
            interval,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Run the retry loop until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Notification retrier cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.retry_pending().await {
                        tracing::error!(error = %e, "Failed to retry owner notifications");
                    }
                }
            }
        }
    }

    /// Re-attempt one batch of undelivered entries. Returns how many were
    /// delivered.
    pub async fn retry_pending(&self) -> Result<usize, sqlx::Error> {
        let pending = ProjectNotificationRepo::list_undelivered(
            self.dispatcher.pool(),
            self.max_attempts,
            BATCH_SIZE,
        )
        .await?;

        let mut delivered = 0;
        for entry in &pending {
            match self.dispatcher.redeliver(entry).await {
                Ok(DispatchOutcome::Delivered) => delivered += 1,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(
                        notification_id = entry.id,
                        error = %e,
                        "Failed to retry owner notification"
                    );
                }
            }
        }

        if !pending.is_empty() {
            tracing::info!(
                attempted = pending.len(),
                delivered,
                "Retried undelivered owner notifications"
            );
        }

        Ok(delivered)
    }
}
