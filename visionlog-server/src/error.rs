//! API error handling module
//!
//! Provides a unified error type for all endpoints. Bodies are plain text: the
//! front end shows them as-is.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use visionlog_core::VisionLogError;

/// Body of every 401 answer.
pub const UNAUTHORIZED_BODY: &str = "Unauthorized Access";

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// No session identity; the client is sent to the login page
    #[error("Login required")]
    LoginRequired { location: String },

    /// Signed in but not allowed on this endpoint
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Landing page rendering failed
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Failure in annotation or streaming
    #[error(transparent)]
    Core(#[from] VisionLogError),

    /// Dataset or table creation failed
    #[error(transparent)]
    Provisioning(VisionLogError),
}

impl ApiError {
    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Redirect to the given login URL
    pub fn login_required(location: impl Into<String>) -> Self {
        Self::LoginRequired {
            location: location.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::LoginRequired { .. } => StatusCode::FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) | Self::Template(_) | Self::Core(_) | Self::Provisioning(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::LoginRequired { .. } => "LOGIN_REQUIRED",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Template(_) => "TEMPLATE_ERROR",
            Self::Core(ref e) | Self::Provisioning(ref e) => match e {
                VisionLogError::UndefinedTable
                | VisionLogError::UndefinedTableReference
                | VisionLogError::UndefinedSchema
                | VisionLogError::NoInsertRequest => "PRECONDITION_FAILED",
                VisionLogError::StreamingFailed => "STREAMING_FAILED",
                VisionLogError::AlreadyExists(_) => "ALREADY_EXISTS",
                VisionLogError::Upstream { .. } | VisionLogError::HttpError(_) => {
                    "UPSTREAM_ERROR"
                }
                VisionLogError::Annotation { .. } => "ANNOTATION_FAILED",
                VisionLogError::Token(_) => "TOKEN_ERROR",
                VisionLogError::Serialization(_) => "SERIALIZATION_ERROR",
            },
        }
    }

    /// Text written to the response body
    fn client_message(&self) -> String {
        match self {
            Self::LoginRequired { .. } => String::new(),
            Self::Unauthorized(_) => UNAUTHORIZED_BODY.to_string(),
            Self::Internal(message) => format!("Internal Server Error: {}", message),
            Self::Template(_) | Self::Provisioning(_) => format!("Internal Error: {}", self),
            Self::Core(_) => format!("Internal Server Error: {}", self),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::LoginRequired { .. } => "login_required",
            Self::Unauthorized(_) => "unauthorized",
            Self::Internal(_) => "internal",
            Self::Template(_) => "template",
            Self::Core(_) => "core",
            Self::Provisioning(_) => "provisioning",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();

        match &self {
            Self::LoginRequired { location } => {
                tracing::debug!(location = %location, "Redirecting to login");
                return (status, [(header::LOCATION, location.as_str())]).into_response();
            }
            Self::Unauthorized(_) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Authorization error"
                );
            }
            Self::Core(e) | Self::Provisioning(e) if e.is_precondition() => {
                tracing::error!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Invalid request to backend"
                );
            }
            _ => {
                tracing::error!(
                    status = %status,
                    category = category,
                    code = code,
                    error = %internal_message,
                    "Server error"
                );
            }
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.client_message(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ApiError::login_required("https://login").status_code(),
            StatusCode::FOUND
        );
        assert_eq!(
            ApiError::unauthorized("not an admin").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(VisionLogError::StreamingFailed).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_client_messages() {
        assert_eq!(
            ApiError::unauthorized("user@example.com").client_message(),
            "Unauthorized Access"
        );
        assert_eq!(
            ApiError::from(VisionLogError::StreamingFailed).client_message(),
            "Internal Server Error: There was an error streaming data to BigQuery"
        );
        assert_eq!(
            ApiError::internal("no file").client_message(),
            "Internal Server Error: no file"
        );
        assert_eq!(
            ApiError::Provisioning(VisionLogError::UndefinedSchema).client_message(),
            "Internal Error: No schema defined for table creation"
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ApiError::from(VisionLogError::NoInsertRequest).error_code(),
            "PRECONDITION_FAILED"
        );
        assert_eq!(
            ApiError::from(VisionLogError::Annotation {
                code: 3,
                message: "Bad image data".to_string()
            })
            .error_code(),
            "ANNOTATION_FAILED"
        );
    }

    #[test]
    fn test_login_redirect_response() {
        let response = ApiError::login_required("https://login.example/?continue=x").into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://login.example/?continue=x"
        );
    }
}
