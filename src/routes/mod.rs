// Route exports
pub mod matches;
pub mod projects;

use actix_web::{http::StatusCode, web, HttpResponse};
use std::sync::Arc;

use crate::models::ErrorResponse;
use crate::services::{MatchingError, MatchingService};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub matching: Arc<MatchingService>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(matches::configure)
            .configure(projects::configure),
    );
}

/// Map a matching failure to its JSON error response
pub fn error_response(err: &MatchingError) -> HttpResponse {
    let (status, error) = match err {
        MatchingError::DirectoryUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "matching_unavailable")
        }
        MatchingError::ProjectNotFound(_) => (StatusCode::NOT_FOUND, "project_not_found"),
        MatchingError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
        MatchingError::Scoring(_) => (StatusCode::INTERNAL_SERVER_ERROR, "scoring_failed"),
    };

    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status_code: status.as_u16(),
    })
}

pub(crate) fn validation_failed(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}
