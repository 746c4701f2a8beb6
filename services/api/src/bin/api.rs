//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{AiriaAdapter, FileKeyValueStore, FreepikAdapter},
    config::Config,
    error::ApiError,
    web::{api_router, rest::ApiDoc, state::AppState},
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use elearning_core::ports::ImageGenerationService;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open Local Storage ---
    let kv = Arc::new(FileKeyValueStore::open(config.storage_path.clone())?);

    // --- 3. Initialize Service Adapters ---
    let airia_adapter = Arc::new(AiriaAdapter::new(
        config.airia_api_url.clone(),
        config.feedback_api_url.clone(),
        config.airia_api_key.clone(),
        config.airia_timeout,
    )?);

    let image_adapter: Option<Arc<dyn ImageGenerationService>> = match &config.freepik_api_key {
        Some(key) => Some(Arc::new(FreepikAdapter::new(
            config.freepik_api_url.clone(),
            key.clone(),
            config.freepik_max_attempts,
            config.freepik_poll_interval,
        )?)),
        None => {
            warn!("FREEPIK_API_KEY not configured; image generation disabled");
            None
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        config.clone(),
        kv,
        airia_adapter.clone(),
        airia_adapter,
        image_adapter,
    ));

    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::InvalidCorsOrigin {
            origin: config.cors_origin.clone(),
            reason: e.to_string(),
        })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let app = Router::new()
        .merge(api_router(app_state))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!("Airia endpoint: {}", config.airia_api_url);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
