//! Route definitions for the generation resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// Routes mounted at the `/api/v1` root.
///
/// ```text
/// POST /designs/{design_id}/generations   generate
/// GET  /generations                       list_own
/// GET  /generations/status                get_status
/// GET  /generations/{id}                  get_by_id
/// GET  /admin/generations                 list_all (admin only)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/designs/{design_id}/generations",
            post(generation::generate),
        )
        .route("/generations", get(generation::list_own))
        .route("/generations/status", get(generation::get_status))
        .route("/generations/{id}", get(generation::get_by_id))
        .route("/admin/generations", get(generation::list_all))
}
