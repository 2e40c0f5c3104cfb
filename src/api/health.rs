use crate::api::{response::ApiResponse, routes::AppState};
use crate::observability::MetricsRecorder;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ReadinessStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    pub rate_limit_tracked_keys: usize,
}

/// GET /api/v1/health - Liveness probe
pub async fn health() -> Json<ApiResponse<()>> {
    ApiResponse::success("Server is running healthy!", ())
}

/// GET /api/v1/health/ready - Readiness probe
#[tracing::instrument(skip(state))]
pub async fn readiness(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessStatus>) {
    let database_ok = match crate::db::health_check(&state.db_pool).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Database readiness check failed: {}", e);
            false
        }
    };

    let status = ReadinessStatus {
        status: if database_ok { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database: if database_ok { "ok" } else { "error" },
        rate_limit_tracked_keys: state.limiter.tracked_keys(),
    };

    let code = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(status))
}

/// GET /metrics - Prometheus metrics
pub async fn metrics() -> Result<String, StatusCode> {
    MetricsRecorder::export().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
