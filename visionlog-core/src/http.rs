//! Shared plumbing for the Google REST clients.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Result, VisionLogError};

/// Default request timeout for outbound API calls.
pub const DEFAULT_API_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    #[serde(default)]
    message: String,
}

/// Decode a successful JSON body, or turn the failure into a `VisionLogError`.
pub(crate) async fn json_or_error<T: DeserializeOwned>(
    service: &'static str,
    response: Response,
) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    Err(upstream_error(service, status, &text))
}

/// Build the error for a non-2xx answer, keeping Google's own message when present.
pub(crate) fn upstream_error(service: &'static str, status: StatusCode, body: &str) -> VisionLogError {
    let message = serde_json::from_str::<GoogleErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    if status == StatusCode::CONFLICT {
        return VisionLogError::AlreadyExists(message);
    }

    VisionLogError::Upstream {
        service,
        status: status.as_u16(),
        message,
    }
}
