pub mod auth;
pub mod contributions;
pub mod notifications;
pub mod projects;
pub mod rewards;

use crowdfund_core::error::CoreError;
use crowdfund_core::types::DbId;
use crowdfund_db::models::project::Project;
use crowdfund_db::repositories::ProjectRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Request body for `POST .../transitions`.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest<S> {
    pub to: S,
}

/// Load a project or fail with 404.
pub(crate) async fn find_project(state: &AppState, id: DbId) -> AppResult<Project> {
    ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        }))
}

/// Load a project the caller may see: drafts are hidden (404) from everyone
/// but their owner and admins.
pub(crate) async fn find_visible_project(
    state: &AppState,
    user: Option<&AuthUser>,
    id: DbId,
) -> AppResult<Project> {
    let project = find_project(state, id).await?;
    let is_public = project.project_state()?.is_public();
    if is_public || user.is_some_and(|u| u.is_owner_or_admin(project.user_id)) {
        Ok(project)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        }))
    }
}

/// Require the caller to own `project` or be an admin.
pub(crate) fn ensure_owner_or_admin(user: &AuthUser, project: &Project) -> AppResult<()> {
    if user.is_owner_or_admin(project.user_id) {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden(
            "Only the project owner or an admin may do this".into(),
        )))
    }
}
