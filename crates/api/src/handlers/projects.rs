//! Handlers for the `/projects` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use crowdfund_core::error::CoreError;
use crowdfund_core::lifecycle::validate_online_days;
use crowdfund_core::money::validate_positive_amount;
use crowdfund_core::presentation::{ProjectCard, ProjectPresentation, RewardView};
use crowdfund_core::project_state::ProjectState;
use crowdfund_core::types::DbId;
use crowdfund_db::models::project::{CreateProject, Project, UpdateProject};
use crowdfund_db::models::reward::Reward;
use crowdfund_db::repositories::{ProjectRepo, RewardRepo};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{ensure_owner_or_admin, find_project, find_visible_project, TransitionRequest};
use crate::engine::projects::transition_project;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::middleware::rbac::RequireAdmin;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// A project with its rewards and rendered presentation fields.
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub presentation: ProjectPresentation,
    pub rewards: Vec<Reward>,
}

/// Payload of the embeddable project widget.
#[derive(Debug, Serialize)]
pub struct ProjectEmbed {
    pub id: DbId,
    pub name: String,
    pub headline: Option<String>,
    pub goal: Decimal,
    pub total: Decimal,
    #[serde(flatten)]
    pub card: ProjectCard,
}

/// Payload of the owner's success page.
#[derive(Debug, Serialize)]
pub struct ProjectSuccess {
    pub id: DbId,
    pub name: String,
    pub state: String,
    pub goal: Decimal,
    pub total: Decimal,
    pub reached_goal: bool,
    pub status: String,
}

/// POST /api/v1/projects
///
/// Creates a `draft` owned by the caller.
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateProject>,
) -> AppResult<(StatusCode, Json<DataResponse<Project>>)> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("Project name must not be empty".into()));
    }
    validate_positive_amount(input.goal, "goal")?;
    validate_online_days(input.online_days)?;

    let project = ProjectRepo::create(&state.pool, user.user_id, &input).await?;
    tracing::info!(project_id = project.id, owner_id = user.user_id, "Project created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: project })))
}

/// GET /api/v1/projects
///
/// Public listing; drafts are never included.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<Project>>>> {
    let (limit, offset) = params.resolve();
    let projects = ProjectRepo::list_public(&state.pool, limit, offset).await?;
    Ok(Json(DataResponse { data: projects }))
}

/// GET /api/v1/projects/mine
///
/// Every project owned by the caller, drafts included.
pub async fn list_mine(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Project>>>> {
    let projects = ProjectRepo::list_by_owner(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse { data: projects }))
}

/// GET /api/v1/projects/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProjectDetail>>> {
    let project = find_visible_project(&state, user.as_ref(), id).await?;
    let rewards = RewardRepo::list_by_project(&state.pool, id).await?;

    let reward_views: Vec<RewardView> = rewards.iter().map(Reward::view).collect();
    let presentation = ProjectPresentation::build(&project.view(), &reward_views, Utc::now());

    Ok(Json(DataResponse {
        data: ProjectDetail {
            project,
            presentation,
            rewards,
        },
    }))
}

/// GET /api/v1/projects/{id}/embed
///
/// The card other sites embed. Same visibility as the detail page.
pub async fn embed(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProjectEmbed>>> {
    let project = find_visible_project(&state, user.as_ref(), id).await?;
    let card = ProjectCard::build(&project.view(), Utc::now());

    Ok(Json(DataResponse {
        data: ProjectEmbed {
            id: project.id,
            name: project.name,
            headline: project.headline,
            goal: project.goal,
            total: project.total,
            card,
        },
    }))
}

/// PUT /api/v1/projects/{id}
///
/// Owners of a launched project may only change the fields the edit policy
/// allows; anything else in the body is ignored. Admins may change all
/// fields in any state.
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProject>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = find_project(&state, id).await?;
    ensure_owner_or_admin(&user, &project)?;

    let input = if user.is_admin() {
        input
    } else {
        input.restrict_for_owner(project.project_state()?)
    };

    if let Some(name) = &input.name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("Project name must not be empty".into()));
        }
    }
    if let Some(goal) = input.goal {
        validate_positive_amount(goal, "goal")?;
    }
    if let Some(online_days) = input.online_days {
        validate_online_days(online_days)?;
    }

    let project = ProjectRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        }))?;
    Ok(Json(DataResponse { data: project }))
}

/// GET /api/v1/projects/{id}/success
///
/// Only the owner may see the success page.
pub async fn success(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProjectSuccess>>> {
    let project = find_project(&state, id).await?;
    if project.user_id != user.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the project owner may view this page".into(),
        )));
    }

    let view = project.view();
    Ok(Json(DataResponse {
        data: ProjectSuccess {
            id: project.id,
            reached_goal: view.reached_goal,
            status: crowdfund_core::presentation::display_status(view.state, view.reached_goal),
            name: project.name,
            state: project.state,
            goal: project.goal,
            total: project.total,
        },
    }))
}

/// POST /api/v1/projects/{id}/transitions
///
/// Admin-only guarded lifecycle change.
pub async fn transition(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<TransitionRequest<ProjectState>>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = find_project(&state, id).await?;
    let updated = transition_project(&state.pool, &project, input.to).await?;
    tracing::info!(project_id = id, admin_id = admin.user_id, to = %input.to, "Admin moved project");
    Ok(Json(DataResponse { data: updated }))
}
