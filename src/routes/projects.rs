use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::models::MatchProjectRequest;
use crate::routes::{error_response, validation_failed, AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/projects/{project_id}/match", web::post().to(match_project));
}

/// Match a stored project and auto-assign when the best score allows it
///
/// POST /api/v1/projects/{projectId}/match
///
/// The body is optional; `{ "limit": 5 }` overrides the default limit.
async fn match_project(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: Option<web::Json<MatchProjectRequest>>,
) -> impl Responder {
    let project_id = path.into_inner();
    let request = body.map(web::Json::into_inner).unwrap_or_default();

    if let Err(errors) = request.validate() {
        return validation_failed(errors);
    }

    match state
        .matching
        .assign_best_match(&project_id, request.limit.map(usize::from))
        .await
    {
        Ok(outcome) => {
            if !outcome.warnings.is_empty() {
                tracing::warn!(
                    "Project {} matched with warnings: {:?}",
                    project_id,
                    outcome.warnings
                );
            }
            HttpResponse::Ok().json(outcome)
        }
        Err(e) => {
            tracing::error!("Failed to match project {}: {}", project_id, e);
            error_response(&e)
        }
    }
}
