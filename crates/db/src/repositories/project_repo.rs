//! Repository for the `projects` table.
//!
//! `total` is never written here; see [`crate::aggregator`].

use crowdfund_core::project_state::ProjectState;
use crowdfund_core::types::{DbId, Timestamp};
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};

use crate::models::project::{CreateProject, Project, UpdateProject};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, name, headline, summary, goal, total, online_date, \
                       online_days, state, location, address_neighborhood, video_url, \
                       video_thumbnail_url, uploaded_image_url, organization_type, \
                       created_at, updated_at";

/// Provides CRUD and lifecycle operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project in `draft`, owned by `owner_id`.
    pub async fn create(
        pool: &PgPool,
        owner_id: DbId,
        input: &CreateProject,
    ) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (user_id, name, headline, summary, goal, online_days, \
                location, address_neighborhood, video_url, video_thumbnail_url, \
                uploaded_image_url, organization_type)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(owner_id)
            .bind(&input.name)
            .bind(&input.headline)
            .bind(&input.summary)
            .bind(input.goal)
            .bind(input.online_days)
            .bind(&input.location)
            .bind(&input.address_neighborhood)
            .bind(&input.video_url)
            .bind(&input.video_thumbnail_url)
            .bind(&input.uploaded_image_url)
            .bind(&input.organization_type)
            .fetch_one(pool)
            .await
    }

    /// Find a project by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a project inside a transaction, locking its row until commit.
    pub async fn find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// List publicly visible (non-draft) projects, most recent first.
    pub async fn list_public(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects
             WHERE state <> 'draft'
             ORDER BY created_at DESC, id DESC
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// List every project owned by a user, drafts included.
    pub async fn list_by_owner(pool: &PgPool, owner_id: DbId) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    /// Update a project. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProject,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                name = COALESCE($2, name),
                headline = COALESCE($3, headline),
                summary = COALESCE($4, summary),
                goal = COALESCE($5, goal),
                online_date = COALESCE($6, online_date),
                online_days = COALESCE($7, online_days),
                location = COALESCE($8, location),
                address_neighborhood = COALESCE($9, address_neighborhood),
                video_url = COALESCE($10, video_url),
                video_thumbnail_url = COALESCE($11, video_thumbnail_url),
                uploaded_image_url = COALESCE($12, uploaded_image_url),
                organization_type = COALESCE($13, organization_type)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.headline)
            .bind(&input.summary)
            .bind(input.goal)
            .bind(input.online_date)
            .bind(input.online_days)
            .bind(&input.location)
            .bind(&input.address_neighborhood)
            .bind(&input.video_url)
            .bind(&input.video_thumbnail_url)
            .bind(&input.uploaded_image_url)
            .bind(&input.organization_type)
            .fetch_optional(pool)
            .await
    }

    /// Move a project from `from` to `to`, storing `online_date`.
    ///
    /// The update only applies while the row is still in `from`, so a
    /// concurrent transition makes this return `None` instead of overwriting.
    /// Callers validate the edge beforehand. Runs on a pool or inside an
    /// open transaction.
    pub async fn set_state<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        from: ProjectState,
        to: ProjectState,
        online_date: Option<Timestamp>,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET state = $3, online_date = $4
             WHERE id = $1 AND state = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(online_date)
            .fetch_optional(executor)
            .await
    }

    /// Projects the finisher must look at: `online` projects whose window
    /// closed at or before `now`, and every `waiting_funds` project.
    pub async fn list_finishable(
        pool: &PgPool,
        now: Timestamp,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects
             WHERE (state = 'online'
                    AND online_date IS NOT NULL
                    AND online_date + make_interval(days => online_days) <= $1)
                OR state = 'waiting_funds'
             ORDER BY id"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(now)
            .fetch_all(pool)
            .await
    }
}
