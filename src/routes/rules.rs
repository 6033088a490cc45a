//! Rule routes: the classification/ignore run and rule administration.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::errors::{ActionResult, ApiResponse, AppError};
use crate::models::rule::{BusinessRule, CloneRule, CreateRule, RuleLog, RuleType, ToggleRule, UpdateRule};
use crate::services::rule as rule_service;
use crate::services::rule_run::{self, RuleRunSummary};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RuleFilter {
    pub rule_type: Option<RuleType>,
}

/// POST /api/v1/rules/run: Classify or ignore every file awaiting rules.
pub async fn run(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ActionResult<RuleRunSummary>>>, AppError> {
    let result = rule_run::run(&state.db).await?;
    Ok(ApiResponse::success(result))
}

/// GET /api/v1/rules: List rules, optionally of one type.
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<RuleFilter>,
) -> Result<Json<ApiResponse<Vec<BusinessRule>>>, AppError> {
    let rules = rule_service::list(&state.db, filter.rule_type).await?;
    Ok(ApiResponse::success(rules))
}

/// POST /api/v1/rules: Create a rule with the next code of its type.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateRule>,
) -> Result<Json<ApiResponse<BusinessRule>>, AppError> {
    body.validate()?;
    let rule = rule_service::create(&state.db, &body).await?;
    Ok(ApiResponse::success(rule))
}

/// PUT /api/v1/rules/{id}: Replace a rule's patterns and target.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateRule>,
) -> Result<Json<ApiResponse<BusinessRule>>, AppError> {
    body.validate()?;
    let rule = rule_service::update(&state.db, id, &body).await?;
    Ok(ApiResponse::success(rule))
}

/// POST /api/v1/rules/{id}/clone: Copy a rule under a clone code.
pub async fn clone_rule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CloneRule>,
) -> Result<Json<ApiResponse<BusinessRule>>, AppError> {
    body.validate()?;
    let rule = rule_service::clone_rule(&state.db, id, &body).await?;
    Ok(ApiResponse::success(rule))
}

/// POST /api/v1/rules/{id}/toggle: Enable or disable a rule.
pub async fn toggle(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ToggleRule>,
) -> Result<Json<ApiResponse<BusinessRule>>, AppError> {
    body.validate()?;
    let rule = rule_service::toggle(&state.db, id, &body).await?;
    Ok(ApiResponse::success(rule))
}

/// GET /api/v1/rules/{code}/logs: Change history of a rule code.
///
/// Routed as `/rules/{id}/logs`; the segment holds the code.
pub async fn logs(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<Vec<RuleLog>>>, AppError> {
    let logs = rule_service::logs(&state.db, &code).await?;
    Ok(ApiResponse::success(logs))
}
