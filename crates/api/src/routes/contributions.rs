//! Route definitions for the `/contributions` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::contributions;
use crate::state::AppState;

/// Routes mounted at `/contributions`.
///
/// ```text
/// GET  /mine               -> list_mine
/// GET  /{id}               -> get_by_id
/// POST /{id}/transitions   -> transition
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/mine", get(contributions::list_mine))
        .route("/{id}", get(contributions::get_by_id))
        .route("/{id}/transitions", post(contributions::transition))
}
