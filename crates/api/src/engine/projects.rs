//! Guarded project lifecycle transitions.

use chrono::Utc;
use crowdfund_core::error::CoreError;
use crowdfund_core::lifecycle::online_date_on_transition;
use crowdfund_core::project_state::{validate_transition, ProjectState};
use crowdfund_db::models::project::Project;
use crowdfund_db::repositories::ProjectRepo;
use sqlx::PgExecutor;

use crate::error::{AppError, AppResult};

/// Move `project` to `to`, stamping the online date on launch.
///
/// Fails with `INVALID_TRANSITION` for edges outside the state machine and
/// with `CONFLICT` when the stored state changed since `project` was read.
/// Runs on the pool or inside the caller's transaction.
pub async fn transition_project<'e, E: PgExecutor<'e>>(
    executor: E,
    project: &Project,
    to: ProjectState,
) -> AppResult<Project> {
    let from = project.project_state()?;
    validate_transition(from, to)?;

    let online_date = online_date_on_transition(to, project.online_date, Utc::now());
    let updated = ProjectRepo::set_state(executor, project.id, from, to, online_date)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(format!(
                "Project {} is no longer in state '{from}'",
                project.id
            )))
        })?;

    tracing::info!(
        project_id = project.id,
        from = %from,
        to = %to,
        "Project transitioned"
    );
    Ok(updated)
}
