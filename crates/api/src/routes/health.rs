use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthReport {
    status: &'static str,
    version: &'static str,
    checks: HealthChecks,
}

/// Per-dependency probes. Only the database today; the generation
/// provider is deliberately not probed here, since a provider outage
/// should not flip readiness for the read endpoints.
#[derive(Serialize)]
struct HealthChecks {
    database: &'static str,
}

/// GET /health -- overall status plus per-dependency checks. Degraded
/// reports 503 so load balancers can act on the status code alone.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let database_up = decora_db::health_check(&state.pool).await.is_ok();

    let (http_status, status) = if database_up {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        http_status,
        Json(HealthReport {
            status,
            version: env!("CARGO_PKG_VERSION"),
            checks: HealthChecks {
                database: if database_up { "up" } else { "down" },
            },
        }),
    )
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
