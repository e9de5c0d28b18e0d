// Integration tests for contractor matching and auto-assignment

use actix_web::{test, web, App};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use contractor_match::core::Matcher;
use contractor_match::models::{
    ContractorProfile, EligibilityCriteria, MatchResult, ProjectRecord, ProjectRequirement,
    ProjectStatus,
};
use contractor_match::routes::{configure_routes, AppState};
use contractor_match::services::{
    ContractorDirectory, DirectoryError, DirectorySeed, InMemoryDirectory, LogNotifier,
    MatchingError, MatchingOptions, MatchingService, NotificationError, NotificationSink,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn create_test_contractor(id: &str, current_projects: u32) -> ContractorProfile {
    serde_json::from_value(json!({
        "id": id,
        "businessName": format!("Contractor {}", id),
        "status": "Active",
        "verification": { "profileVerified": true },
        "expertise": {
            "categories": ["Kitchen"],
            "configurations": ["2BHK"],
            "propertyTypes": ["Apartment"],
            "specializations": ["Modular Kitchen"]
        },
        "serviceAreas": {
            "primary": "Pune",
            "maxTravelDistance": 50,
            "primaryCoordinates": { "latitude": 18.5204, "longitude": 73.8567 }
        },
        "pricing": { "minimumProject": 100000 },
        "availability": { "currentProjects": current_projects, "maxConcurrentProjects": 3 },
        "ratings": { "overall": 4.5, "totalReviews": 60 }
    }))
    .unwrap()
}

/// Eligible but unremarkable: no specialization, few reviews, no coordinates
fn create_weak_contractor(id: &str) -> ContractorProfile {
    serde_json::from_value(json!({
        "id": id,
        "status": "Active",
        "verification": { "profileVerified": true },
        "expertise": {
            "categories": ["Kitchen"],
            "configurations": ["2BHK"],
            "propertyTypes": ["Apartment"]
        },
        "serviceAreas": { "primary": "Pune" },
        "pricing": { "minimumProject": 100000 },
        "availability": { "currentProjects": 2, "maxConcurrentProjects": 3 },
        "ratings": { "overall": 3.0, "totalReviews": 4 }
    }))
    .unwrap()
}

fn create_test_requirement() -> ProjectRequirement {
    serde_json::from_value(json!({
        "category": "Kitchen",
        "configuration": "2BHK",
        "propertyType": "Apartment",
        "specialRequirements": ["Modular Kitchen"],
        "budget": { "total": 500000 },
        "location": {
            "city": "Pune",
            "coordinates": { "latitude": 18.5204, "longitude": 73.8567 }
        },
        "timeline": { "preferredStartDate": Utc::now() + ChronoDuration::days(45) },
        "matching": { "urgencyLevel": "High" }
    }))
    .unwrap()
}

fn create_test_project(id: &str) -> ProjectRecord {
    ProjectRecord::new(id, format!("client-{}", id), create_test_requirement())
}

#[derive(Default)]
struct CountingNotifier {
    contractor: AtomicUsize,
    client: AtomicUsize,
}

#[async_trait]
impl NotificationSink for CountingNotifier {
    async fn notify_contractor_assigned(
        &self,
        _contractor_id: &str,
        _project_id: &str,
    ) -> Result<(), NotificationError> {
        self.contractor.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn notify_client_assigned(
        &self,
        _client_id: &str,
        _contractor_id: &str,
    ) -> Result<(), NotificationError> {
        self.client.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl NotificationSink for FailingNotifier {
    async fn notify_contractor_assigned(
        &self,
        _contractor_id: &str,
        _project_id: &str,
    ) -> Result<(), NotificationError> {
        Err(NotificationError::Rejected("contractor_assignment returned 500".to_string()))
    }

    async fn notify_client_assigned(
        &self,
        _client_id: &str,
        _contractor_id: &str,
    ) -> Result<(), NotificationError> {
        Err(NotificationError::Rejected("client_assignment returned 500".to_string()))
    }
}

struct BrokenDirectory;

#[async_trait]
impl ContractorDirectory for BrokenDirectory {
    async fn find_eligible(
        &self,
        _criteria: &EligibilityCriteria,
    ) -> Result<Vec<ContractorProfile>, DirectoryError> {
        Err(DirectoryError::InvalidRecord("connection reset".to_string()))
    }

    async fn health_check(&self) -> bool {
        false
    }
}

struct SlowDirectory;

#[async_trait]
impl ContractorDirectory for SlowDirectory {
    async fn find_eligible(
        &self,
        _criteria: &EligibilityCriteria,
    ) -> Result<Vec<ContractorProfile>, DirectoryError> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(Vec::new())
    }
}

fn seeded(contractors: Vec<ContractorProfile>, projects: Vec<ProjectRecord>) -> Arc<InMemoryDirectory> {
    Arc::new(InMemoryDirectory::from_seed(DirectorySeed {
        contractors,
        projects,
    }))
}

fn create_service(
    directory: Arc<InMemoryDirectory>,
    notifier: Arc<dyn NotificationSink>,
) -> MatchingService {
    MatchingService::new(
        Matcher::with_default_weights(),
        directory.clone(),
        directory,
        notifier,
        MatchingOptions::default(),
    )
}

fn ids(result: &MatchResult) -> Vec<&str> {
    result.matches.iter().map(|m| m.contractor_id()).collect()
}

#[tokio::test]
async fn test_integration_auto_assigns_strong_match() {
    let directory = seeded(
        vec![create_test_contractor("c1", 0), create_weak_contractor("c2")],
        vec![create_test_project("p1")],
    );
    let notifier = Arc::new(CountingNotifier::default());
    let service = create_service(directory.clone(), notifier.clone());

    let outcome = service.assign_best_match("p1", None).await.unwrap();

    assert!(outcome.is_assigned());
    assert_eq!(outcome.assigned_contractor_id.as_deref(), Some("c1"));
    assert_eq!(outcome.score, Some(97.15));
    assert_eq!(outcome.alternates, vec!["c2"]);
    assert!(outcome.warnings.is_empty());

    let project = directory.project("p1").await.unwrap();
    assert_eq!(project.status, ProjectStatus::Assigned);
    assert_eq!(project.contractor_id.as_deref(), Some("c1"));
    assert_eq!(project.algorithm_score, Some(97.15));
    assert_eq!(project.alternate_contractors, vec!["c2"]);
    assert!(project.actual_start_date.is_some());

    let contractor = directory.contractor("c1").await.unwrap();
    assert_eq!(contractor.availability.current_projects, 1);
    assert_eq!(contractor.project_history, vec!["p1"]);

    assert_eq!(notifier.contractor.load(Ordering::SeqCst), 1);
    assert_eq!(notifier.client.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_below_threshold_records_alternates_only() {
    let directory = seeded(
        vec![
            create_weak_contractor("w1"),
            create_weak_contractor("w2"),
            create_weak_contractor("w3"),
            create_weak_contractor("w4"),
            create_weak_contractor("w5"),
        ],
        vec![create_test_project("p1")],
    );
    let notifier = Arc::new(CountingNotifier::default());
    let service = create_service(directory.clone(), notifier.clone());

    let outcome = service.assign_best_match("p1", None).await.unwrap();

    assert!(!outcome.is_assigned());
    assert!(outcome.match_result.top().unwrap().score < 80.0);
    // Equal scores keep directory order, so the top match is w1
    assert_eq!(outcome.alternates, vec!["w2", "w3", "w4"]);

    let project = directory.project("p1").await.unwrap();
    assert_eq!(project.status, ProjectStatus::Requested);
    assert!(project.contractor_id.is_none());
    assert_eq!(project.alternate_contractors, vec!["w2", "w3", "w4"]);

    for id in ["w1", "w2", "w3", "w4", "w5"] {
        assert_eq!(directory.contractor(id).await.unwrap().availability.current_projects, 2);
    }
    assert_eq!(notifier.contractor.load(Ordering::SeqCst), 0);
    assert_eq!(notifier.client.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_no_eligible_contractors() {
    let mut busy = create_test_contractor("full", 0);
    busy.availability.current_projects = 3;
    let directory = seeded(vec![busy], vec![create_test_project("p1")]);
    let notifier = Arc::new(CountingNotifier::default());
    let service = create_service(directory.clone(), notifier.clone());

    let outcome = service.assign_best_match("p1", None).await.unwrap();

    assert!(!outcome.match_result.success);
    assert!(outcome.match_result.matches.is_empty());
    assert_eq!(outcome.match_result.message.as_deref(), Some("No contractors available"));
    assert!(outcome.alternates.is_empty());

    let project = directory.project("p1").await.unwrap();
    assert_eq!(project.status, ProjectStatus::Requested);
    assert_eq!(notifier.contractor.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_find_best_matches_is_read_only_and_repeatable() {
    let directory = seeded(
        vec![
            create_weak_contractor("w1"),
            create_test_contractor("c1", 1),
            create_test_contractor("c2", 0),
        ],
        vec![],
    );
    let service = create_service(directory.clone(), Arc::new(LogNotifier));
    let project = create_test_requirement();

    let first = service.find_best_matches(&project, None).await.unwrap();
    let second = service.find_best_matches(&project, None).await.unwrap();

    assert_eq!(ids(&first), vec!["c2", "c1", "w1"]);
    assert_eq!(ids(&first), ids(&second));
    let scores: Vec<f64> = first.matches.iter().map(|m| m.score).collect();
    assert_eq!(scores, second.matches.iter().map(|m| m.score).collect::<Vec<_>>());
    assert_eq!(first.total_available, 3);

    assert_eq!(directory.contractor("c2").await.unwrap().availability.current_projects, 0);
}

#[tokio::test]
async fn test_limit_truncates_but_reports_total() {
    let contractors = (0..8).map(|i| create_weak_contractor(&format!("w{}", i))).collect();
    let directory = seeded(contractors, vec![]);
    let service = create_service(directory, Arc::new(LogNotifier));

    let result = service
        .find_best_matches(&create_test_requirement(), Some(2))
        .await
        .unwrap();

    assert_eq!(result.matches.len(), 2);
    assert_eq!(result.total_available, 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_assignments_respect_capacity() {
    // Sole eligible contractor with exactly one free slot, scoring 81.32
    let directory = seeded(
        vec![create_test_contractor("solo", 2)],
        vec![create_test_project("p1"), create_test_project("p2")],
    );
    let service = Arc::new(create_service(directory.clone(), Arc::new(LogNotifier)));

    let first = tokio::spawn({
        let service = service.clone();
        async move { service.assign_best_match("p1", None).await }
    });
    let second = tokio::spawn({
        let service = service.clone();
        async move { service.assign_best_match("p2", None).await }
    });

    let outcomes = [first.await.unwrap().unwrap(), second.await.unwrap().unwrap()];
    let assigned = outcomes.iter().filter(|o| o.is_assigned()).count();
    assert_eq!(assigned, 1);

    let solo = directory.contractor("solo").await.unwrap();
    assert_eq!(solo.availability.current_projects, 3);
    assert_eq!(solo.project_history.len(), 1);

    let statuses = [
        directory.project("p1").await.unwrap().status,
        directory.project("p2").await.unwrap().status,
    ];
    assert_eq!(
        statuses.iter().filter(|s| **s == ProjectStatus::Assigned).count(),
        1
    );
}

#[tokio::test]
async fn test_conflict_falls_back_to_next_candidate() {
    let directory = seeded(
        vec![create_test_contractor("best", 0), create_test_contractor("next", 1)],
        vec![create_test_project("p1")],
    );
    let service = create_service(directory.clone(), Arc::new(LogNotifier));
    let project = directory.project("p1").await.unwrap();

    let result = service
        .find_best_matches(&project.requirement, None)
        .await
        .unwrap();
    assert_eq!(ids(&result), vec!["best", "next"]);

    // Another assignment takes the best contractor's capacity before commit
    directory.upsert_contractor(create_test_contractor("best", 3)).await;

    let outcome = service.apply_assignment(&project, result).await.unwrap();

    assert_eq!(outcome.assigned_contractor_id.as_deref(), Some("next"));
    assert_eq!(outcome.score, Some(89.48));
    assert_eq!(outcome.conflicts, vec!["best"]);
    assert!(outcome.alternates.is_empty());
    assert_eq!(directory.contractor("best").await.unwrap().availability.current_projects, 3);
    assert_eq!(directory.contractor("next").await.unwrap().availability.current_projects, 2);
}

#[tokio::test]
async fn test_notification_failure_keeps_assignment() {
    let directory = seeded(vec![create_test_contractor("c1", 0)], vec![create_test_project("p1")]);
    let service = create_service(directory.clone(), Arc::new(FailingNotifier));

    let outcome = service.assign_best_match("p1", None).await.unwrap();

    assert!(outcome.is_assigned());
    assert_eq!(outcome.warnings.len(), 2);
    assert_eq!(
        directory.project("p1").await.unwrap().status,
        ProjectStatus::Assigned
    );
}

#[tokio::test]
async fn test_already_assigned_project_is_rejected() {
    let directory = seeded(vec![create_test_contractor("c1", 0)], vec![create_test_project("p1")]);
    let service = create_service(directory.clone(), Arc::new(LogNotifier));

    service.assign_best_match("p1", None).await.unwrap();
    let err = service.assign_best_match("p1", None).await.unwrap_err();

    assert!(matches!(
        err,
        MatchingError::InvalidTransition { status: ProjectStatus::Assigned, .. }
    ));
    assert_eq!(directory.contractor("c1").await.unwrap().availability.current_projects, 1);
}

#[tokio::test]
async fn test_stale_run_cannot_overwrite_assigned_project() {
    let directory = seeded(
        vec![
            create_test_contractor("strong", 2),
            create_weak_contractor("w1"),
            create_weak_contractor("w2"),
        ],
        vec![create_test_project("p1")],
    );
    let service = create_service(directory.clone(), Arc::new(LogNotifier));
    let stale = directory.project("p1").await.unwrap();

    let first = service.assign_best_match("p1", None).await.unwrap();
    assert_eq!(first.assigned_contractor_id.as_deref(), Some("strong"));
    assert_eq!(first.alternates, vec!["w1", "w2"]);

    // "strong" is now full, so the late run only sees weak contractors
    let result = service
        .find_best_matches(&stale.requirement, None)
        .await
        .unwrap();
    assert_eq!(ids(&result), vec!["w1", "w2"]);

    let err = service.apply_assignment(&stale, result).await.unwrap_err();
    assert!(matches!(
        err,
        MatchingError::InvalidTransition { status: ProjectStatus::Assigned, .. }
    ));

    let project = directory.project("p1").await.unwrap();
    assert_eq!(project.status, ProjectStatus::Assigned);
    assert_eq!(project.contractor_id.as_deref(), Some("strong"));
    assert_eq!(project.alternate_contractors, vec!["w1", "w2"]);
}

#[tokio::test]
async fn test_unknown_project() {
    let directory = seeded(vec![], vec![]);
    let service = create_service(directory, Arc::new(LogNotifier));

    let err = service.assign_best_match("missing", None).await.unwrap_err();
    assert!(matches!(err, MatchingError::ProjectNotFound(ref id) if id == "missing"));
}

#[tokio::test]
async fn test_directory_failure_is_unavailable() {
    let store = seeded(vec![], vec![]);
    let service = MatchingService::new(
        Matcher::with_default_weights(),
        Arc::new(BrokenDirectory),
        store,
        Arc::new(LogNotifier),
        MatchingOptions::default(),
    );

    let err = service
        .find_best_matches(&create_test_requirement(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingError::DirectoryUnavailable(_)));
    assert!(!service.directory_healthy().await);
}

#[tokio::test]
async fn test_directory_timeout_is_unavailable() {
    let store = seeded(vec![], vec![]);
    let service = MatchingService::new(
        Matcher::with_default_weights(),
        Arc::new(SlowDirectory),
        store,
        Arc::new(LogNotifier),
        MatchingOptions {
            directory_timeout: Duration::from_millis(20),
            ..MatchingOptions::default()
        },
    );

    let err = service
        .find_best_matches(&create_test_requirement(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingError::DirectoryUnavailable(ref msg) if msg.contains("timed out")));
}

fn app_state(directory: Arc<InMemoryDirectory>) -> AppState {
    AppState {
        matching: Arc::new(create_service(directory, Arc::new(LogNotifier))),
    }
}

#[actix_web::test]
async fn test_http_find_matches() {
    let directory = seeded(vec![create_test_contractor("c1", 0)], vec![]);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(directory)))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/matches/find")
        .set_json(json!({ "project": create_test_requirement(), "limit": 3 }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["totalAvailable"], 1);
    assert_eq!(body["matches"][0]["contractor"]["id"], "c1");
    assert_eq!(body["matches"][0]["score"], 97.15);
}

#[actix_web::test]
async fn test_http_rejects_invalid_limit() {
    let directory = seeded(vec![], vec![]);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(directory)))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/matches/find")
        .set_json(json!({ "project": create_test_requirement(), "limit": 0 }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status().as_u16(), 400);
}

#[actix_web::test]
async fn test_http_match_project() {
    let directory = seeded(vec![create_test_contractor("c1", 0)], vec![create_test_project("p1")]);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(directory.clone())))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/projects/p1/match")
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["assignedContractorId"], "c1");
    assert_eq!(body["project"]["status"], "Assigned");

    let req = test::TestRequest::post()
        .uri("/api/v1/projects/missing/match")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);

    let req = test::TestRequest::post()
        .uri("/api/v1/projects/p1/match")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 409);
}

#[actix_web::test]
async fn test_http_health() {
    let directory = seeded(vec![], vec![]);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(app_state(directory)))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "healthy");
}
