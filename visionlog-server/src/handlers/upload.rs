//! Upload handler
//!
//! Handles POST /upload: annotate the image, record the visit, return the
//! annotations.

use axum::{
    extract::{Multipart, State},
    Json,
};
use visionlog_core::vision::BatchAnnotateImagesResponse;
use visionlog_core::{extract_features, project_row, stream_rows, InsertAllRequest, VisitMetadata};

use crate::auth::RequestContext;
use crate::error::ApiError;
use crate::multipart::read_upload;
use crate::state::AppState;

/// Analyze an uploaded image
///
/// Accepts multipart/form-data with:
/// - **select_files** (required): the image, at most 32 MB by default
///
/// The image is sent to the Vision API for labels, landmarks, logos and text.
/// One row describing the visit is streamed to BigQuery before the
/// annotations are returned. Nothing is stored when annotation fails.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "Analysis",
    request_body(
        content_type = "multipart/form-data",
        description = "Image under the select_files field"
    ),
    responses(
        (status = 200, description = "Vision API batch response for the image"),
        (status = 302, description = "Not signed in, redirected to login"),
        (status = 500, description = "Upload, annotation or streaming failed")
    )
)]
pub async fn upload_handler(
    State(state): State<AppState>,
    context: RequestContext,
    mut multipart: Multipart,
) -> Result<Json<BatchAnnotateImagesResponse>, ApiError> {
    let file = read_upload(&mut multipart, state.settings.max_upload_bytes).await?;

    let annotations = extract_features(state.annotator.as_ref(), &file.data).await?;

    let metadata = VisitMetadata {
        user_id: context.user.id.clone(),
        time: chrono::Utc::now(),
        upload: file.upload_info(),
        geo: context.client.geo.clone(),
        user_agent: context.client.parsed_user_agent(),
    };
    let row = project_row(annotations.first(), &metadata);
    let request = InsertAllRequest::new(vec![row]);

    let destination = state.settings.visit_table_reference();
    stream_rows(state.store.as_ref(), &destination, Some(&request)).await?;

    tracing::info!(
        user = %context.user.id,
        file_name = %file.file_name,
        size = file.data.len(),
        "Upload analyzed and recorded"
    );

    Ok(Json(annotations))
}
