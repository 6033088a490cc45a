//! Health check endpoints for liveness and readiness.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::errors::ApiResponse;
use crate::AppState;

/// Readiness check detail.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub database: String,
    pub storage: String,
}

/// Liveness check. Always OK while the process runs.
pub async fn live() -> &'static str {
    "OK"
}

/// Readiness check. Checks the database and the content store root.
pub async fn ready(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    let db_status = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "connected".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            format!("error: {e}")
        }
    };

    let storage_status = match tokio::fs::create_dir_all(state.store.root()).await {
        Ok(()) => "writable".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Storage health check failed");
            format!("error: {e}")
        }
    };

    let status = if db_status == "connected" && storage_status == "writable" {
        "ok"
    } else {
        "degraded"
    };

    ApiResponse::success(HealthStatus {
        status: status.to_string(),
        database: db_status,
        storage: storage_status,
    })
}
