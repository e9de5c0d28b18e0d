use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::models::{FindMatchesRequest, HealthResponse};
use crate::routes::{error_response, validation_failed, AppState};

/// Configure health and read-only matching routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matches/find", web::post().to(find_matches));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let directory_healthy = state.matching.directory_healthy().await;

    let status = if directory_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Find matches endpoint
///
/// POST /api/v1/matches/find
///
/// Request body:
/// ```json
/// {
///   "project": {
///     "category": "Kitchen",
///     "configuration": "2BHK",
///     "budget": { "total": 500000 },
///     "location": { "city": "Pune", "coordinates": { "latitude": 18.52, "longitude": 73.85 } },
///     "matching": { "urgencyLevel": "High" }
///   },
///   "limit": 5
/// }
/// ```
///
/// Read-only: nothing is assigned.
async fn find_matches(
    state: web::Data<AppState>,
    req: web::Json<FindMatchesRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for find_matches request: {:?}", errors);
        return validation_failed(errors);
    }

    let request = req.into_inner();
    tracing::info!(
        "Finding matches for category {:?} in {:?}, limit {:?}",
        request.project.category,
        request.project.city(),
        request.limit
    );

    match state
        .matching
        .find_best_matches(&request.project, request.limit.map(usize::from))
        .await
    {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => {
            tracing::error!("Failed to find matches: {}", e);
            error_response(&e)
        }
    }
}
