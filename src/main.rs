mod config;
mod core;
mod models;
mod routes;
mod services;

use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use config::{Settings, StoreBackend};
use core::{JobCatalog, MutationController, RelevanceScorer, SessionRegistry};
use routes::AppState;
use services::{CacheManager, FirestoreClient, FirestoreOptions, GeminiClient, InMemoryStore, ProfileStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
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

/// Handle path parameter errors (e.g. a non-numeric job id)
pub fn handle_path_error(err: error::PathError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_path".to_string(),
        message: format!("Invalid path: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn build_store(settings: &Settings) -> std::io::Result<Arc<dyn ProfileStore>> {
    match settings.store.backend {
        StoreBackend::Memory => {
            warn!("Using in-memory profile store; data is lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
        StoreBackend::Firestore => {
            let store = &settings.store;
            let client = FirestoreClient::new(FirestoreOptions {
                base_url: store.base_url.clone(),
                storage_url: store.storage_url.clone(),
                project_id: store.project_id.clone(),
                database_id: store.database_id.clone(),
                collection: store.collection.clone(),
                bucket: store.bucket.clone(),
                api_key: store.api_key.clone(),
                access_token: store.access_token.clone(),
                timeout_secs: store.timeout_secs,
            })
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
            info!("Firestore client initialized for project {}", store.project_id);
            Ok(Arc::new(client))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::process::exit(1);
    });

    // LOG_LEVEL / LOG_FORMAT win over the config file
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());
    init_logging(&log_level, &log_format);

    info!("Starting SkillMatch service...");

    let store = build_store(&settings)?;

    let scorer_settings = &settings.scorer;
    if scorer_settings.api_key.is_empty() {
        warn!("No scorer API key configured; match requests will report the feature as unavailable");
    }
    let gemini = GeminiClient::new(
        scorer_settings.base_url.clone(),
        scorer_settings.model.clone(),
        scorer_settings.api_key.clone(),
        Duration::from_secs(scorer_settings.timeout_secs),
        scorer_settings.max_retries,
    )
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let scorer = Arc::new(RelevanceScorer::new(Arc::new(gemini)));

    info!("Relevance scorer initialized with model {}", scorer_settings.model);

    // Redis is optional; without it match results are cached per process
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(3600);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache = match CacheManager::new(
        settings.cache.redis_url.as_deref(),
        l1_cache_size,
        cache_ttl,
    )
    .await
    {
        Ok(c) => {
            info!(
                "Cache manager initialized (L1: {} entries, L2: {}, TTL: {}s)",
                l1_cache_size,
                c.has_l2(),
                cache_ttl
            );
            Arc::new(c)
        }
        Err(e) => {
            error!("Failed to connect to Redis ({}), caching match results in-process only", e);
            Arc::new(CacheManager::local(l1_cache_size, cache_ttl))
        }
    };

    let catalog = Arc::new(JobCatalog::default());
    let controller = Arc::new(MutationController::new(store.clone(), catalog.clone()));
    let sessions = SessionRegistry::new(settings.sessions.max_sessions, settings.sessions.idle_secs);

    info!("Job catalog loaded with {} postings", catalog.all().len());

    // Build application state
    let app_state = AppState {
        store,
        catalog,
        controller,
        scorer,
        sessions,
        cache,
    };

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
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .app_data(web::PayloadConfig::new(5 * 1024 * 1024))
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
