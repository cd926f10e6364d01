pub mod generation;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /designs/{design_id}/generations   start a generation (POST)
///
/// /generations                       own history (GET)
/// /generations/status                quota + balance snapshot (GET)
/// /generations/{id}                  one record, ownership-checked (GET)
///
/// /admin/generations                 all users' records (GET, admin only)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(generation::router())
}
