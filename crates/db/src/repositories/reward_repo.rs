//! Repository for the `rewards` table.

use crowdfund_core::types::DbId;
use sqlx::PgPool;

use crate::models::reward::{CreateReward, Reward};

const COLUMNS: &str = "id, project_id, title, description, minimum_value, yield_rate, \
                       happens_at, created_at, updated_at";

pub struct RewardRepo;

impl RewardRepo {
    /// Insert a reward under `project_id`, returning the created row.
    pub async fn create(
        pool: &PgPool,
        project_id: DbId,
        input: &CreateReward,
    ) -> Result<Reward, sqlx::Error> {
        let query = format!(
            "INSERT INTO rewards (project_id, title, description, minimum_value, yield_rate, happens_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Reward>(&query)
            .bind(project_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.minimum_value)
            .bind(input.yield_rate)
            .bind(input.happens_at)
            .fetch_one(pool)
            .await
    }

    /// List a project's rewards, cheapest first.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Reward>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM rewards WHERE project_id = $1 ORDER BY minimum_value, id"
        );
        sqlx::query_as::<_, Reward>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }
}
