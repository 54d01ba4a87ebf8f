//! Multipart form parsing for the upload endpoint.
//!
//! The form carries a single file under `select_files`; other fields and any
//! further `select_files` parts are skipped.

use axum::extract::Multipart;
use visionlog_core::UploadInfo;

use crate::error::ApiError;

/// Name of the file field posted by the landing page.
pub const UPLOAD_FIELD: &str = "select_files";

/// Represents the file uploaded via the multipart form
#[derive(Debug, Clone)]
pub struct FileField {
    /// File data bytes
    pub data: Vec<u8>,
    /// Content-Type of the part, empty when not provided
    pub content_type: String,
    /// Original filename, empty when not provided
    pub file_name: String,
}

impl FileField {
    /// Upload details recorded with the visit.
    pub fn upload_info(&self) -> UploadInfo {
        UploadInfo {
            filename: self.file_name.clone(),
            content_type: self.content_type.clone(),
            size: self.data.len(),
        }
    }
}

/// Read the first `select_files` part in full.
///
/// Every failure, including a missing field, is an internal error: the
/// landing page is the only client.
pub async fn read_upload(multipart: &mut Multipart, max_file_size: usize) -> Result<FileField, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to parse multipart: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        tracing::debug!(file_name = %file_name, content_type = %content_type, "Receiving upload");

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to read file: {}", e)))?
            .to_vec();

        validate_file_size(data.len(), max_file_size)?;

        return Ok(FileField {
            data,
            content_type,
            file_name,
        });
    }

    Err(ApiError::internal(format!(
        "No file provided. Use '{}' field in multipart form.",
        UPLOAD_FIELD
    )))
}

/// Validate file size against maximum allowed
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ApiError> {
    if size > max_size {
        let max_mb = max_size / (1024 * 1024);
        let actual_mb = size / (1024 * 1024);
        Err(ApiError::internal(format!(
            "File too large: {} MB exceeds maximum of {} MB",
            actual_mb, max_mb
        )))
    } else {
        Ok(())
    }
}
