//! Health check handlers
//!
//! Provides health and readiness endpoints for monitoring and orchestration.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    #[schema(example = "healthy")]
    pub status: &'static str,
    /// Server version from Cargo.toml
    pub version: &'static str,
    /// Service name
    #[schema(example = "visionlog-server")]
    pub service: &'static str,
}

/// Liveness check
///
/// Returns JSON with service status and version. The Vision and BigQuery
/// backends are not contacted.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "visionlog-server",
    })
}

/// Readiness response for load balancer checks
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the service is ready to accept traffic
    pub ready: bool,
}

/// Readiness check
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse)
    )
)]
pub async fn ready() -> Json<ReadyResponse> {
    Json(ReadyResponse { ready: true })
}
