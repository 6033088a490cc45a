//! File routes: manual lifecycle actions, intake and file details.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ActionResult, ApiResponse, AppError};
use crate::models::file::FileRecord;
use crate::services::approval::{self, ApproveRequest};
use crate::services::duplicates::{self, Resolution, ResolveUpdateRequest};
use crate::services::file::{self as file_service, FileDetails, FileTrail};
use crate::services::intake::{self, IntakeOutcome, IntakeRequest, UploadLimits};
use crate::services::lifecycle::{self, CommentRequest, ReplayRequest, StatusUpdateRequest};
use crate::AppState;

/// POST /api/v1/files/replay: Replay failed files.
pub async fn replay(
    State(state): State<AppState>,
    Json(body): Json<ReplayRequest>,
) -> Result<Json<ApiResponse<ActionResult<Vec<Uuid>>>>, AppError> {
    body.validate()?;
    let result = lifecycle::replay(&state.db, &body).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/v1/files/status: Ignore or restore a comma-separated list of files.
pub async fn update_status(
    State(state): State<AppState>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<ApiResponse<ActionResult<Vec<Uuid>>>>, AppError> {
    body.validate()?;
    let result = lifecycle::update_status(&state.db, &body).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/v1/files/{uid}/approve: Approve a file with linked accounts.
pub async fn approve(
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
    Json(body): Json<ApproveRequest>,
) -> Result<Json<ApiResponse<ActionResult<FileRecord>>>, AppError> {
    body.validate()?;
    let result = approval::approve(&state.db, uid, &body).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/v1/files/{uid}/comments: Add a comment.
pub async fn add_comment(
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
    Json(body): Json<CommentRequest>,
) -> Result<Json<ApiResponse<ActionResult<FileRecord>>>, AppError> {
    body.validate()?;
    let result = lifecycle::add_comment(&state.db, uid, &body).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/v1/files/resolve-update: Keep or discard an update file.
pub async fn resolve_update(
    State(state): State<AppState>,
    Json(body): Json<ResolveUpdateRequest>,
) -> Result<Json<ApiResponse<ActionResult<Resolution>>>, AppError> {
    body.validate()?;
    let result = duplicates::resolve_update(&state.db, &body).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/v1/files/intake: Capture base64-encoded uploads.
pub async fn intake(
    State(state): State<AppState>,
    Json(body): Json<IntakeRequest>,
) -> Result<Json<ApiResponse<ActionResult<Vec<IntakeOutcome>>>>, AppError> {
    body.validate()?;
    let limits = UploadLimits {
        max_files: state.config.max_upload_files,
        max_bytes: state.config.max_upload_bytes,
    };
    let result = intake::ingest(&state.db, &state.store, &limits, &body).await?;
    Ok(ApiResponse::success(result))
}

/// GET /api/v1/files/{uid}: File with SLA evaluation.
pub async fn get_by_uid(
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
) -> Result<Json<ApiResponse<FileDetails>>, AppError> {
    let details = file_service::details(&state.db, uid).await?;
    Ok(ApiResponse::success(details))
}

/// GET /api/v1/files/{uid}/activity: Activity and process log rows.
pub async fn activity(
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
) -> Result<Json<ApiResponse<FileTrail>>, AppError> {
    let trail = file_service::trail(&state.db, uid).await?;
    Ok(ApiResponse::success(trail))
}
