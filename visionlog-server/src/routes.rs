//! Router configuration module
//!
//! Configures all routes, middleware layers, and creates the application router.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, StatusCode},
    routing::{get, post},
    Router,
};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::handlers::{
    bigquery_console_handler, health, home_handler, init_handler, ready, upload_handler,
};
use crate::openapi::openapi_json;
use crate::state::AppState;

/// Create the application router with custom configuration
///
/// With rate limiting enabled the router must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_router(state: AppState, config: &Config) -> Router {
    // Configure CORS based on allowed_origins
    let cors = match &config.allowed_origins {
        Some(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            tracing::info!("CORS: Restricting to {} origin(s)", origins.len());
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        }
        _ => {
            tracing::warn!("CORS: Allowing all origins (dev mode)");
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    // Body limit enforced by the multipart extractor, so the login gate runs
    // first and an oversize upload surfaces as an upload error
    let body_limit = DefaultBodyLimit::max(config.body_limit_mb * 1024 * 1024);

    // Request timeout, longer than an annotation plus both insert attempts
    let timeout = TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.timeout_secs),
    );

    let router = Router::new()
        .route("/", get(home_handler))
        .route("/upload", post(upload_handler))
        .route("/init", post(init_handler))
        .route("/bq", get(bigquery_console_handler))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/api-docs/openapi.json", get(openapi_json))
        .fallback(home_handler)
        .with_state(state)
        .layer(body_limit)
        .layer(cors)
        .layer(timeout);

    // Conditionally apply rate limiting (disabled in tests, enabled in production)
    if config.rate_limit_enabled {
        let governor_conf = GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_sec)
            .burst_size(config.rate_limit_burst)
            .finish();

        match governor_conf {
            Some(governor_conf) => {
                tracing::info!(
                    "Rate limiting: {} req/s (burst: {})",
                    config.rate_limit_per_sec,
                    config.rate_limit_burst
                );
                return router
                    .layer(GovernorLayer::new(Arc::new(governor_conf)))
                    .layer(TraceLayer::new_for_http());
            }
            None => tracing::warn!(
                per_second = config.rate_limit_per_sec,
                burst = config.rate_limit_burst,
                "Rate limiting: invalid settings, DISABLED"
            ),
        }
    } else {
        tracing::warn!("Rate limiting: DISABLED");
    }

    router.layer(TraceLayer::new_for_http())
}
