//! Handlers for the caller's owner notifications.

use axum::extract::{Query, State};
use axum::Json;
use crowdfund_db::models::notification::ProjectNotification;
use crowdfund_db::repositories::ProjectNotificationRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/notifications
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<ProjectNotification>>>> {
    let (limit, offset) = params.resolve();
    let notifications =
        ProjectNotificationRepo::list_by_user(&state.pool, user.user_id, limit, offset).await?;
    Ok(Json(DataResponse {
        data: notifications,
    }))
}
