pub mod auth;
pub mod contributions;
pub mod health;
pub mod notifications;
pub mod projects;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                           register (public)
/// /auth/login                              login (public)
///
/// /projects                                list (public), create (auth)
/// /projects/mine                           caller's projects (auth)
/// /projects/{id}                           get (public unless draft), update (owner/admin)
/// /projects/{id}/success                   success page (owner)
/// /projects/{id}/transitions               change state (admin)
/// /projects/{id}/rewards                   list (public unless draft), create (owner/admin)
/// /projects/{id}/contributions             list (owner/admin), create (auth)
///
/// /contributions/mine                      caller's contributions (auth)
/// /contributions/{id}                      get (contributor/owner/admin)
/// /contributions/{id}/transitions          change state (admin, or contributor canceling)
///
/// /notifications                           caller's owner notifications (auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/projects", projects::router())
        .nest("/contributions", contributions::router())
        .nest("/notifications", notifications::router())
}
