//! PostgreSQL implementation of the project total aggregator.

use async_trait::async_trait;
use crowdfund_core::error::CoreError;
use crowdfund_core::funding::{FundingSnapshot, TotalAggregator};
use crowdfund_core::project_state::ProjectState;
use crowdfund_core::types::DbId;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};

/// Recomputes project totals inside the caller's open transaction.
///
/// The project row is locked with `SELECT ... FOR UPDATE` before summing, so
/// concurrent recomputes for one project run one after the other and the
/// sum (a fresh statement snapshot) always sees the previously committed
/// contributions.
pub struct PgTotalAggregator<'t, 'c> {
    tx: &'t mut Transaction<'c, Postgres>,
}

impl<'t, 'c> PgTotalAggregator<'t, 'c> {
    pub fn new(tx: &'t mut Transaction<'c, Postgres>) -> Self {
        Self { tx }
    }

    async fn recompute_inner(&mut self, project_id: DbId) -> Result<FundingSnapshot, AggError> {
        let row: Option<(DbId, Decimal, String)> =
            sqlx::query_as("SELECT user_id, goal, state FROM projects WHERE id = $1 FOR UPDATE")
                .bind(project_id)
                .fetch_optional(&mut **self.tx)
                .await?;

        let Some((owner_id, goal, state)) = row else {
            return Err(AggError::Core(CoreError::NotFound {
                entity: "Project",
                id: project_id,
            }));
        };
        let state: ProjectState = state.parse().map_err(AggError::Core)?;

        let total: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(value), 0) FROM contributions \
             WHERE project_id = $1 AND state = 'confirmed'",
        )
        .bind(project_id)
        .fetch_one(&mut **self.tx)
        .await?;

        let result = sqlx::query("UPDATE projects SET total = $2 WHERE id = $1")
            .bind(project_id)
            .bind(total)
            .execute(&mut **self.tx)
            .await?;
        if result.rows_affected() != 1 {
            return Err(AggError::Core(CoreError::AggregationFailure(format!(
                "total of project {project_id} was not written"
            ))));
        }

        Ok(FundingSnapshot {
            project_id,
            owner_id,
            goal,
            total,
            state,
        })
    }
}

enum AggError {
    Db(sqlx::Error),
    Core(CoreError),
}

impl From<sqlx::Error> for AggError {
    fn from(e: sqlx::Error) -> Self {
        Self::Db(e)
    }
}

#[async_trait]
impl<'t, 'c> TotalAggregator for PgTotalAggregator<'t, 'c> {
    async fn recompute(&mut self, project_id: DbId) -> Result<FundingSnapshot, CoreError> {
        match self.recompute_inner(project_id).await {
            Ok(snapshot) => Ok(snapshot),
            Err(AggError::Core(e)) => Err(e),
            Err(AggError::Db(e)) => Err(CoreError::AggregationFailure(format!(
                "recomputing total of project {project_id}: {e}"
            ))),
        }
    }
}
