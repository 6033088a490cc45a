//! File configuration routes.

use axum::{extract::State, Json};
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::models::file_configuration::{FileConfiguration, UpsertFileConfiguration};
use crate::services::file_configuration;
use crate::AppState;

/// GET /api/v1/file-configurations: List configurations.
pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<FileConfiguration>>>, AppError> {
    let rows = file_configuration::list(&state.db).await?;
    Ok(ApiResponse::success(rows))
}

/// PUT /api/v1/file-configurations: Create or update a configuration by name.
pub async fn upsert(
    State(state): State<AppState>,
    Json(body): Json<UpsertFileConfiguration>,
) -> Result<Json<ApiResponse<FileConfiguration>>, AppError> {
    body.validate()?;
    let row = file_configuration::upsert(&state.db, &body).await?;
    Ok(ApiResponse::success(row))
}
