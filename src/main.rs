use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use nearby_contacts::config::{LoggingSettings, Settings};
use nearby_contacts::core::{BatchGeocodeController, NearbyService, RadiusSearchEngine, SearchHistoryStore};
use nearby_contacts::routes::{self, AppState};
use nearby_contacts::services::{
    CacheKey, ContactDirectory, ContactSnapshot, GeocodeClient, GhlClient, KeyValueStore,
    MapboxClient, MemoryStore, RedisStore,
};

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
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self)
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

fn init_logging(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

async fn build_store(settings: &Settings) -> Arc<dyn KeyValueStore> {
    let Some(redis_url) = settings.cache.redis_url.as_deref() else {
        info!("No Redis URL configured, keeping search history in memory");
        return Arc::new(MemoryStore::new());
    };

    match RedisStore::new(redis_url, settings.cache.l1_cache_size, settings.cache.ttl_secs).await {
        Ok(store) => {
            info!(
                "History store initialized (L1: {} entries, TTL: {}s)",
                settings.cache.l1_cache_size, settings.cache.ttl_secs
            );
            Arc::new(store)
        }
        Err(e) => {
            error!("Failed to connect to Redis ({}), keeping search history in memory", e);
            Arc::new(MemoryStore::new())
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            init_logging(&LoggingSettings::default());
            error!("Failed to load configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    init_logging(&settings.logging);
    info!("Starting nearby contacts service...");

    let account_id = settings.crm.account_id.clone().unwrap_or_default();
    if account_id.is_empty() || settings.crm.access_token.is_none() {
        warn!("CRM credentials are not configured; searches and batch runs will ask to reconnect");
    }

    let fields = settings.fields.coordinate_fields();

    let geocoder: Arc<dyn GeocodeClient> = Arc::new(MapboxClient::new(
        settings.geocoder.base_url.clone(),
        settings.geocoder.access_token.clone(),
        settings.geocoder.timeout_secs.unwrap_or(10),
    ));

    let directory: Arc<dyn ContactDirectory> = Arc::new(GhlClient::new(
        settings.crm.base_url.clone(),
        settings.crm.access_token.clone(),
        fields.clone(),
        settings.crm.page_size.unwrap_or(100),
        settings.crm.max_pages.unwrap_or(500),
        settings.crm.timeout_secs.unwrap_or(30),
    ));

    info!("CRM and geocoder clients initialized");

    let snapshot = Arc::new(ContactSnapshot::new(Arc::clone(&directory), account_id.clone()));

    let history = Arc::new(SearchHistoryStore::new(
        build_store(&settings).await,
        CacheKey::history(&account_id),
        settings.history.max_entries,
    ));

    let nearby = Arc::new(NearbyService::new(
        RadiusSearchEngine::new(fields.clone()),
        Arc::clone(&geocoder),
        Arc::clone(&snapshot),
        history,
        settings.fields.sortable.clone(),
        settings.debug.inspect_contacts,
    ));

    let batch_settings = settings.batch.settings();
    let batch = Arc::new(BatchGeocodeController::new(
        directory,
        geocoder,
        Arc::clone(&snapshot),
        fields,
        batch_settings,
    ));

    info!("Batch geocoder initialized (delay: {:?})", batch_settings.delay());

    if let Some(secs) = settings.batch.auto_run_interval_secs.filter(|s| *s > 0) {
        let _scheduler = batch.schedule(Duration::from_secs(secs));
        info!("Scheduled batch geocode every {}s", secs);
    }

    // Warm the contact snapshot without blocking startup
    let warm = Arc::clone(&snapshot);
    tokio::spawn(async move {
        if let Err(e) = warm.refresh().await {
            warn!("Initial contact load failed: {}", e);
        }
    });

    let app_state = AppState { nearby, batch };

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
