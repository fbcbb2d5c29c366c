//! Handlers for rewards nested under `/projects/{id}/rewards`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use crowdfund_core::error::CoreError;
use crowdfund_core::money::validate_positive_amount;
use crowdfund_core::types::DbId;
use crowdfund_db::models::reward::{CreateReward, Reward};
use crowdfund_db::repositories::RewardRepo;
use rust_decimal::Decimal;

use super::{ensure_owner_or_admin, find_project, find_visible_project};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/projects/{id}/rewards
pub async fn list(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Reward>>>> {
    find_visible_project(&state, user.as_ref(), project_id).await?;
    let rewards = RewardRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(DataResponse { data: rewards }))
}

/// POST /api/v1/projects/{id}/rewards
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<DbId>,
    Json(input): Json<CreateReward>,
) -> AppResult<(StatusCode, Json<DataResponse<Reward>>)> {
    let project = find_project(&state, project_id).await?;
    ensure_owner_or_admin(&user, &project)?;

    if input.title.trim().is_empty() {
        return Err(AppError::BadRequest("Reward title must not be empty".into()));
    }
    validate_positive_amount(input.minimum_value, "minimum_value")?;
    if input.yield_rate.is_some_and(|rate| rate < Decimal::ZERO) {
        return Err(AppError::Core(CoreError::Validation(
            "yield_rate must not be negative".into(),
        )));
    }

    let reward = RewardRepo::create(&state.pool, project_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: reward })))
}
