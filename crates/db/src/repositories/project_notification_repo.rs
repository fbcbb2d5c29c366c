//! Repository for the `project_notifications` ledger.
//!
//! `UNIQUE (project_id, kind)` is what makes owner notifications
//! at-most-once: [`ProjectNotificationRepo::create_once`] returns `None` for
//! every request after the first. Sending is guarded separately: a sender
//! must hold the entry's claim ([`ProjectNotificationRepo::claim`]) so the
//! dispatcher and the retrier never deliver the same entry concurrently.

use std::time::Duration;

use crowdfund_core::types::DbId;
use sqlx::PgPool;

use crate::models::notification::ProjectNotification;

/// Column list for `project_notifications` queries.
const COLUMNS: &str =
    "id, project_id, user_id, kind, channel, attempts, delivered_at, last_error, claimed_at, created_at";

pub struct ProjectNotificationRepo;

impl ProjectNotificationRepo {
    /// Record a notification unless one already exists for
    /// `(project_id, kind)`.
    ///
    /// The new row is claimed by the caller, who is expected to deliver it.
    /// Returns `None` if it was a duplicate.
    pub async fn create_once(
        pool: &PgPool,
        project_id: DbId,
        user_id: DbId,
        kind: &str,
        channel: &str,
    ) -> Result<Option<ProjectNotification>, sqlx::Error> {
        let query = format!(
            "INSERT INTO project_notifications (project_id, user_id, kind, channel, claimed_at)
             VALUES ($1, $2, $3, $4, NOW())
             ON CONFLICT ON CONSTRAINT uq_project_notifications_project_kind DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectNotification>(&query)
            .bind(project_id)
            .bind(user_id)
            .bind(kind)
            .bind(channel)
            .fetch_optional(pool)
            .await
    }

    /// Find the ledger entry for `(project_id, kind)`.
    pub async fn find_by_project_kind(
        pool: &PgPool,
        project_id: DbId,
        kind: &str,
    ) -> Result<Option<ProjectNotification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM project_notifications WHERE project_id = $1 AND kind = $2"
        );
        sqlx::query_as::<_, ProjectNotification>(&query)
            .bind(project_id)
            .bind(kind)
            .fetch_optional(pool)
            .await
    }

    /// Claim an undelivered entry for one delivery attempt.
    ///
    /// Succeeds when nobody holds the entry or the previous claim is older
    /// than `lease`. Returns `None` when it is delivered or claimed by
    /// another sender.
    pub async fn claim(
        pool: &PgPool,
        id: DbId,
        lease: Duration,
    ) -> Result<Option<ProjectNotification>, sqlx::Error> {
        let query = format!(
            "UPDATE project_notifications SET claimed_at = NOW()
             WHERE id = $1 AND delivered_at IS NULL
               AND (claimed_at IS NULL OR claimed_at < NOW() - make_interval(secs => $2))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectNotification>(&query)
            .bind(id)
            .bind(lease.as_secs_f64())
            .fetch_optional(pool)
            .await
    }

    /// Mark a notification delivered, counting the successful attempt.
    ///
    /// Returns `false` if it had already been delivered.
    pub async fn mark_delivered(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE project_notifications \
             SET delivered_at = NOW(), attempts = attempts + 1, last_error = NULL, claimed_at = NULL \
             WHERE id = $1 AND delivered_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a failed delivery attempt and release the claim.
    pub async fn record_failure(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE project_notifications \
             SET attempts = attempts + 1, last_error = $2, claimed_at = NULL \
             WHERE id = $1 AND delivered_at IS NULL",
        )
        .bind(id)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Undelivered notifications with fewer than `max_attempts` attempts,
    /// oldest first. Entries may still be claimed by a sender in flight;
    /// callers must [`claim`](Self::claim) before delivering.
    pub async fn list_undelivered(
        pool: &PgPool,
        max_attempts: i32,
        limit: i64,
    ) -> Result<Vec<ProjectNotification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM project_notifications
             WHERE delivered_at IS NULL AND attempts < $1
             ORDER BY created_at, id
             LIMIT $2"
        );
        sqlx::query_as::<_, ProjectNotification>(&query)
            .bind(max_attempts)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// List a user's notifications, most recent first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProjectNotification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM project_notifications
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, ProjectNotification>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
