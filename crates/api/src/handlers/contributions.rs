//! Handlers for contributions: created under `/projects/{id}/contributions`,
//! addressed individually under `/contributions/{id}`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use crowdfund_core::contribution_state::ContributionState;
use crowdfund_core::error::CoreError;
use crowdfund_core::funding::ContributionObserver;
use crowdfund_core::types::DbId;
use crowdfund_db::models::contribution::{
    Contribution, ContributionInput, ContributionTransitionRow,
};
use crowdfund_db::repositories::ContributionRepo;
use serde::Serialize;

use super::{ensure_owner_or_admin, find_project, TransitionRequest};
use crate::engine::contributions::{
    create_contribution, transition_contribution, ContributionWrite, Contributor,
};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// A contribution with its state-change history.
#[derive(Debug, Serialize)]
pub struct ContributionDetail {
    #[serde(flatten)]
    pub contribution: Contribution,
    pub transitions: Vec<ContributionTransitionRow>,
}

/// GET /api/v1/projects/{id}/contributions
///
/// Project owner or admin only.
pub async fn list_by_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<DbId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<Contribution>>>> {
    let project = find_project(&state, project_id).await?;
    ensure_owner_or_admin(&user, &project)?;

    let (limit, offset) = params.resolve();
    let contributions =
        ContributionRepo::list_by_project(&state.pool, project_id, limit, offset).await?;
    Ok(Json(DataResponse {
        data: contributions,
    }))
}

/// GET /api/v1/contributions/mine
pub async fn list_mine(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Contribution>>>> {
    let contributions = ContributionRepo::list_by_user(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse {
        data: contributions,
    }))
}

/// POST /api/v1/projects/{id}/contributions
///
/// Contributions start `pending`; admins may record them `confirmed`.
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<DbId>,
    Json(input): Json<ContributionInput>,
) -> AppResult<(StatusCode, Json<DataResponse<ContributionWrite>>)> {
    let observer = ContributionObserver::new(state.notifier.clone());
    let contributor = Contributor {
        user_id: user.user_id,
        is_admin: user.is_admin(),
    };

    let write =
        create_contribution(&state.pool, &observer, project_id, contributor, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: write })))
}

/// GET /api/v1/contributions/{id}
///
/// Visible to the contributor, the project owner, and admins.
pub async fn get_by_id(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ContributionDetail>>> {
    let not_found = || {
        AppError::Core(CoreError::NotFound {
            entity: "Contribution",
            id,
        })
    };

    let contribution = ContributionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;

    if contribution.user_id != user.user_id && !user.is_admin() {
        let project = find_project(&state, contribution.project_id).await?;
        if project.user_id != user.user_id {
            return Err(not_found());
        }
    }

    let transitions = ContributionRepo::list_transitions(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: ContributionDetail {
            contribution,
            transitions,
        },
    }))
}

/// POST /api/v1/contributions/{id}/transitions
///
/// Admins may apply any valid transition. A contributor may only cancel
/// their own contribution.
pub async fn transition(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<TransitionRequest<ContributionState>>,
) -> AppResult<Json<DataResponse<ContributionWrite>>> {
    let observer = ContributionObserver::new(state.notifier.clone());

    let write = transition_contribution(&state.pool, &observer, id, input.to, |current, to| {
        may_transition(&user, current, to)
    })
    .await?;
    Ok(Json(DataResponse { data: write }))
}

fn may_transition(
    user: &AuthUser,
    contribution: &Contribution,
    to: ContributionState,
) -> Result<(), CoreError> {
    if user.is_admin() {
        return Ok(());
    }
    if contribution.user_id == user.user_id && to == ContributionState::Canceled {
        return Ok(());
    }
    Err(CoreError::Forbidden(
        "Only admins may change a contribution's state, except a contributor canceling their own"
            .into(),
    ))
}
