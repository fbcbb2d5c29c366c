//! Route definitions for the `/projects` resource and its nested
//! rewards and contributions.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{contributions, projects, rewards};
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET  /                      -> list
/// POST /                      -> create
/// GET  /mine                  -> list_mine
/// GET  /{id}                  -> get_by_id
/// PUT  /{id}                  -> update
/// GET  /{id}/embed            -> embed
/// GET  /{id}/success          -> success
/// POST /{id}/transitions      -> transition
/// GET  /{id}/rewards          -> rewards::list
/// POST /{id}/rewards          -> rewards::create
/// GET  /{id}/contributions    -> contributions::list_by_project
/// POST /{id}/contributions    -> contributions::create
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(projects::list).post(projects::create))
        .route("/mine", get(projects::list_mine))
        .route("/{id}", get(projects::get_by_id).put(projects::update))
        .route("/{id}/embed", get(projects::embed))
        .route("/{id}/success", get(projects::success))
        .route("/{id}/transitions", post(projects::transition))
        .route("/{id}/rewards", get(rewards::list).post(rewards::create))
        .route(
            "/{id}/contributions",
            get(contributions::list_by_project).post(contributions::create),
        )
}
