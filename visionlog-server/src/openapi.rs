//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3 document served at `/api-docs/openapi.json`.

use axum::Json;
use utoipa::OpenApi;

use crate::handlers::{HealthResponse, ReadyResponse};

/// Vision API demo - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vision API Demo",
        description = r#"
## Image analysis with visit recording

Signed-in users upload a picture from the landing page. The server asks the
Cloud Vision API for labels, landmarks, logos and text, streams one row per
upload into BigQuery and returns the annotations.

Every page and endpoint except the health checks and this document requires a
session; anonymous requests are redirected to login. `/init` and `/bq` are
restricted to administrators.
"#
    ),
    tags(
        (name = "Pages", description = "Browser pages"),
        (name = "Analysis", description = "Image upload and annotation"),
        (name = "Admin", description = "BigQuery provisioning and console access"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::home::home_handler,
        crate::handlers::upload::upload_handler,
        crate::handlers::admin::init_handler,
        crate::handlers::admin::bigquery_console_handler,
        crate::handlers::health::health,
        crate::handlers::health::ready,
    ),
    components(schemas(HealthResponse, ReadyResponse))
)]
pub struct ApiDoc;

/// GET /api-docs/openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_all_routes() {
        let doc = ApiDoc::openapi();
        for path in ["/", "/upload", "/init", "/bq", "/health", "/ready"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
