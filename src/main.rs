use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use contractor_match::config::{DirectoryBackend, Settings};
use contractor_match::core::Matcher;
use contractor_match::routes::{self, AppState};
use contractor_match::services::{
    AssignmentSink, ContractorDirectory, HttpNotifier, InMemoryDirectory, LogNotifier,
    MatchingService, NotificationSink, PostgresDirectory,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// LOG_LEVEL / RUST_LOG and LOG_FORMAT override the logging section
fn init_tracing(settings: &Settings) {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, err);
    std::io::Error::other(format!("{}: {}", context, err))
}

async fn build_directory(
    settings: &Settings,
) -> std::io::Result<(Arc<dyn ContractorDirectory>, Arc<dyn AssignmentSink>)> {
    match settings.directory.backend {
        DirectoryBackend::Postgres => {
            let db_max_conn = settings.database.max_connections.unwrap_or(10);

            let postgres = Arc::new(
                PostgresDirectory::from_settings(
                    &settings.database.url,
                    Some(db_max_conn),
                    settings.database.min_connections,
                    settings.database.acquire_timeout_secs,
                    settings.database.idle_timeout_secs,
                )
                .await
                .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?,
            );

            info!("PostgreSQL directory initialized (max: {} connections)", db_max_conn);
            let directory: Arc<dyn ContractorDirectory> = postgres.clone();
            let assignments: Arc<dyn AssignmentSink> = postgres;
            Ok((directory, assignments))
        }
        DirectoryBackend::Memory => {
            let memory = match &settings.directory.seed_file {
                Some(path) => InMemoryDirectory::from_seed_file(path)
                    .map_err(|e| startup_error("Failed to load directory seed", e))?,
                None => InMemoryDirectory::new(),
            };
            let memory = Arc::new(memory);

            info!("In-memory directory initialized");
            let directory: Arc<dyn ContractorDirectory> = memory.clone();
            let assignments: Arc<dyn AssignmentSink> = memory;
            Ok((directory, assignments))
        }
    }
}

fn build_notifier(settings: &Settings) -> std::io::Result<Arc<dyn NotificationSink>> {
    let Some(endpoint) = settings.notifications.endpoint.clone() else {
        info!("No notification endpoint configured, assignment notifications will only be logged");
        return Ok(Arc::new(LogNotifier));
    };

    let timeout = Duration::from_secs(settings.notifications.timeout_secs.unwrap_or(5));
    let api_key = settings.notifications.api_key.clone().unwrap_or_default();
    let notifier = HttpNotifier::new(endpoint.clone(), api_key, timeout)
        .map_err(|e| startup_error("Failed to build notification client", e))?;

    info!("Notification client initialized for {}", endpoint);
    Ok(Arc::new(notifier))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    init_tracing(&settings);

    info!("Starting contractor matching service...");

    let weights = settings
        .scoring
        .weights
        .to_weights()
        .map_err(|e| startup_error("Invalid scoring weights", e))?;
    let matcher = Matcher::new(weights);

    info!("Matcher initialized with weights: {:?}", weights);

    let (directory, assignments) = build_directory(&settings).await?;
    let notifier = build_notifier(&settings)?;

    let matching = Arc::new(MatchingService::new(
        matcher,
        directory,
        assignments,
        notifier,
        settings.matching_options(),
    ));

    // Build application state
    let app_state = AppState { matching };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
