//! Route definitions for the fileflow API.

pub mod file_configurations;
pub mod files;
pub mod health;
pub mod rules;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::services::intake;
use crate::AppState;

/// Headroom for the JSON envelope around base64 payloads.
const INTAKE_BODY_SLACK: u64 = 1024 * 1024;

/// Transport cap for intake bodies.
///
/// Twice the base64 size of the upload limit, so batches moderately over
/// the limit still reach the batch size check and get its message.
pub fn intake_body_limit(max_upload_bytes: u64) -> usize {
    let encoded = max_upload_bytes.saturating_mul(4) / 3;
    let cap = encoded.saturating_mul(2).saturating_add(INTAKE_BODY_SLACK);
    usize::try_from(cap).unwrap_or(usize::MAX)
}

/// Rewrite a transport-level 413 into the regular error envelope.
async fn oversized_intake(State(max_upload_bytes): State<u64>, response: Response) -> Response {
    if response.status() != StatusCode::PAYLOAD_TOO_LARGE {
        return response;
    }
    tracing::warn!(max_upload_bytes, "Intake body over transport cap");
    AppError::Validation(intake::size_limit_message(max_upload_bytes)).into_response()
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let cors = match state.config.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new().allow_origin(origin),
        Err(e) => {
            tracing::warn!(
                frontend_url = %state.config.frontend_url,
                error = %e,
                "Invalid FRONTEND_URL, CORS origin not set"
            );
            CorsLayer::new()
        }
    }
    .allow_methods([Method::GET, Method::POST, Method::PUT])
    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let rule_routes = Router::new()
        .route("/rules", get(rules::list).post(rules::create))
        .route("/rules/run", post(rules::run))
        .route("/rules/{id}", put(rules::update))
        .route("/rules/{id}/clone", post(rules::clone_rule))
        .route("/rules/{id}/toggle", post(rules::toggle))
        // `{id}` here is the unique rule code, not the numeric id.
        .route("/rules/{id}/logs", get(rules::logs));

    let intake_routes = Router::new()
        .route("/files/intake", post(files::intake))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(intake_body_limit(
            state.config.max_upload_bytes,
        )))
        .layer(middleware::map_response_with_state(
            state.config.max_upload_bytes,
            oversized_intake,
        ));

    let file_routes = Router::new()
        .route("/files/replay", post(files::replay))
        .route("/files/status", post(files::update_status))
        .route("/files/resolve-update", post(files::resolve_update))
        .route("/files/{uid}", get(files::get_by_uid))
        .route("/files/{uid}/activity", get(files::activity))
        .route("/files/{uid}/approve", post(files::approve))
        .route("/files/{uid}/comments", post(files::add_comment));

    let configuration_routes = Router::new().route(
        "/file-configurations",
        get(file_configurations::list).put(file_configurations::upsert),
    );

    Router::new()
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .nest("/api/v1", rule_routes)
        .nest("/api/v1", intake_routes)
        .nest("/api/v1", file_routes)
        .nest("/api/v1", configuration_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
