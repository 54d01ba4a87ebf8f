//! visionlog server - image upload, Vision API annotation, BigQuery streaming
//!
//! Endpoints:
//! - GET  /        - Upload page (signed-in users)
//! - POST /upload  - Annotate an image and record the visit
//! - POST /init    - Create the BigQuery dataset and table (admins)
//! - GET  /bq      - Redirect to the BigQuery console (admins)
//! - GET  /health, /ready - Health checks

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use visionlog_core::{AccessTokenSource, BigQueryClient, VisionClient, DEFAULT_API_TIMEOUT};
use visionlog_server::{create_router, AppSettings, AppState, Config, HeaderIdentityProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "visionlog_server=debug,visionlog_core=debug,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let addr = config.socket_addr();

    let http_client = reqwest::Client::builder()
        .timeout(DEFAULT_API_TIMEOUT)
        .build()?;

    let tokens = Arc::new(match &config.access_token {
        Some(token) => {
            tracing::warn!("Using static access token from GOOGLE_ACCESS_TOKEN");
            AccessTokenSource::fixed(token.clone())
        }
        None => AccessTokenSource::metadata(config.metadata_token_url.clone(), http_client.clone()),
    });

    let annotator = VisionClient::new(http_client.clone(), &config.vision_api_url, tokens.clone());
    let store = BigQueryClient::new(http_client, &config.bigquery_api_url, tokens);
    let identity = HeaderIdentityProvider::from_config(&config);
    if config.admin_emails.is_empty() {
        tracing::warn!("ADMIN_EMAILS is empty: /init and /bq will refuse every user");
    }

    let settings = AppSettings::from_config(&config);
    tracing::info!(
        project = %settings.project_id,
        version = %settings.version_id,
        table = %settings.visit_table_reference(),
        "Starting visionlog-server"
    );

    let state = AppState::new(
        Arc::new(identity),
        Arc::new(annotator),
        Arc::new(store),
        settings,
    );
    let app = create_router(state, &config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
