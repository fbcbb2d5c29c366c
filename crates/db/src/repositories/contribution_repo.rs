//! Repository for the `contributions` table and its transition audit trail.
//!
//! Writes take an open transaction: the caller recomputes the project total
//! in the same transaction before committing.

use crowdfund_core::contribution_state::ContributionTransition;
use crowdfund_core::types::DbId;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};

use crate::models::contribution::{Contribution, ContributionTransitionRow, CreateContribution};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, user_id, value, state, created_at, updated_at";

const TRANSITION_COLUMNS: &str = "id, contribution_id, from_state, to_state, created_at";

/// Provides writes and lookups for contributions.
pub struct ContributionRepo;

impl ContributionRepo {
    /// Insert a contribution inside `tx`, returning the created row.
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        input: &CreateContribution,
    ) -> Result<Contribution, sqlx::Error> {
        let query = format!(
            "INSERT INTO contributions (project_id, user_id, value, state)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Contribution>(&query)
            .bind(input.project_id)
            .bind(input.user_id)
            .bind(input.value)
            .bind(input.state.as_str())
            .fetch_one(&mut **tx)
            .await
    }

    /// Find a contribution by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Contribution>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM contributions WHERE id = $1");
        sqlx::query_as::<_, Contribution>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a contribution inside `tx`, locking its row until commit.
    pub async fn find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<Contribution>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM contributions WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Contribution>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Apply a guarded transition and append it to the audit trail.
    ///
    /// Returns `None` when the row is no longer in `transition.from`.
    pub async fn transition(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        transition: ContributionTransition,
    ) -> Result<Option<Contribution>, sqlx::Error> {
        let query = format!(
            "UPDATE contributions SET state = $3
             WHERE id = $1 AND state = $2
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Contribution>(&query)
            .bind(id)
            .bind(transition.from.as_str())
            .bind(transition.to.as_str())
            .fetch_optional(&mut **tx)
            .await?;

        if updated.is_some() {
            sqlx::query(
                "INSERT INTO contribution_transitions (contribution_id, from_state, to_state) \
                 VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(transition.from.as_str())
            .bind(transition.to.as_str())
            .execute(&mut **tx)
            .await?;
        }

        Ok(updated)
    }

    /// List a project's contributions, oldest first.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Contribution>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM contributions
             WHERE project_id = $1
             ORDER BY created_at, id
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Contribution>(&query)
            .bind(project_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// List a user's contributions, most recent first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<Contribution>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM contributions WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Contribution>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Number of a project's contributions still awaiting confirmation.
    pub async fn pending_count<'e, E: PgExecutor<'e>>(
        executor: E,
        project_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM contributions WHERE project_id = $1 AND state = 'pending'",
        )
        .bind(project_id)
        .fetch_one(executor)
        .await
    }

    /// The audit trail of one contribution, oldest first.
    pub async fn list_transitions(
        pool: &PgPool,
        contribution_id: DbId,
    ) -> Result<Vec<ContributionTransitionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {TRANSITION_COLUMNS} FROM contribution_transitions
             WHERE contribution_id = $1
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, ContributionTransitionRow>(&query)
            .bind(contribution_id)
            .fetch_all(pool)
            .await
    }
}
