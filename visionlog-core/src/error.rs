use thiserror::Error;

/// Marker Google APIs put in front of the message of a 409 on insert.
pub const ALREADY_EXISTS_MARKER: &str = "Already Exists: ";

#[derive(Error, Debug)]
pub enum VisionLogError {
    #[error("No table defined for table creation")]
    UndefinedTable,

    #[error("No table reference defined for table creation")]
    UndefinedTableReference,

    #[error("No schema defined for table creation")]
    UndefinedSchema,

    #[error("No insert request defined for streaming")]
    NoInsertRequest,

    #[error("There was an error streaming data to BigQuery")]
    StreamingFailed,

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{service} API returned status {status}: {message}")]
    Upstream {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Image annotation failed ({code}): {message}")]
    Annotation { code: i32, message: String },

    #[error("Access token error: {0}")]
    Token(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl VisionLogError {
    /// True for the "already exists" answer of an idempotent create.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::AlreadyExists(_) => true,
            Self::Upstream {
                status, message, ..
            } => *status == 409 || message.contains(ALREADY_EXISTS_MARKER),
            _ => false,
        }
    }

    /// True when the request never reached an external service.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::UndefinedTable
                | Self::UndefinedTableReference
                | Self::UndefinedSchema
                | Self::NoInsertRequest
        )
    }
}

pub type Result<T> = std::result::Result<T, VisionLogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_detection() {
        assert!(VisionLogError::AlreadyExists("Already Exists: Dataset p:demo".into())
            .is_already_exists());
        assert!(VisionLogError::Upstream {
            service: "BigQuery",
            status: 409,
            message: "duplicate".into(),
        }
        .is_already_exists());
        assert!(VisionLogError::Upstream {
            service: "BigQuery",
            status: 400,
            message: "Already Exists: Table p:demo.vision".into(),
        }
        .is_already_exists());
        assert!(!VisionLogError::Upstream {
            service: "BigQuery",
            status: 403,
            message: "Access Denied".into(),
        }
        .is_already_exists());
        assert!(!VisionLogError::StreamingFailed.is_already_exists());
    }

    #[test]
    fn test_precondition_errors() {
        assert!(VisionLogError::UndefinedSchema.is_precondition());
        assert!(VisionLogError::NoInsertRequest.is_precondition());
        assert!(!VisionLogError::StreamingFailed.is_precondition());
    }
}
