//! Owner notification ledger model.

use crowdfund_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `project_notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectNotification {
    pub id: DbId,
    pub project_id: DbId,
    pub user_id: DbId,
    pub kind: String,
    pub channel: String,
    pub attempts: i32,
    pub delivered_at: Option<Timestamp>,
    pub last_error: Option<String>,
    /// Set while a sender holds the entry; cleared when the attempt ends.
    pub claimed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl ProjectNotification {
    pub fn is_delivered(&self) -> bool {
        self.delivered_at.is_some()
    }
}
