//! Administrator handlers
//!
//! Table provisioning and the shortcut to the BigQuery console. Both require
//! a signed-in administrator.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use visionlog_core::{ensure_table, visit_table};

use crate::auth::AdminContext;
use crate::error::ApiError;
use crate::state::AppState;

/// Create the visit dataset and table
///
/// Safe to call repeatedly: existing resources are left untouched.
#[utoipa::path(
    post,
    path = "/init",
    tag = "Admin",
    responses(
        (status = 200, description = "Dataset and table exist"),
        (status = 302, description = "Not signed in, redirected to login"),
        (status = 401, description = "Signed-in user is not an administrator"),
        (status = 500, description = "Provisioning failed")
    )
)]
pub async fn init_handler(
    State(state): State<AppState>,
    AdminContext(context): AdminContext,
) -> Result<Html<&'static str>, ApiError> {
    let reference = state.settings.visit_table_reference();
    tracing::debug!(user = %context.user.email, table = %reference, "Creating visit table");

    let table = visit_table(reference);
    ensure_table(state.store.as_ref(), Some(&table))
        .await
        .map_err(ApiError::Provisioning)?;

    Ok(Html("<h1>Table Created</h1>"))
}

/// Open the BigQuery console on the project
#[utoipa::path(
    get,
    path = "/bq",
    tag = "Admin",
    responses(
        (status = 302, description = "Redirect to the BigQuery console, or to login when not signed in"),
        (status = 401, description = "Signed-in user is not an administrator")
    )
)]
pub async fn bigquery_console_handler(
    State(state): State<AppState>,
    _admin: AdminContext,
) -> Response {
    let location = state.settings.console_url();
    tracing::debug!(location = %location, "Redirecting to BigQuery console");
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}
