//! visionlog core - image annotation and visit streaming
//!
//! This crate holds everything behind the HTTP surface:
//!
//! - Vision API feature extraction with a fixed detector list
//! - Projection of annotations and request metadata into a flat visit row
//! - BigQuery streaming insert with a single fixed-delay retry
//! - Idempotent provisioning of the destination dataset and table
//!
//! # Example
//!
//! ```no_run
//! use visionlog_core::mock::{MockAnnotator, MockStore};
//! use visionlog_core::vision::BatchAnnotateImagesResponse;
//! use visionlog_core::{extract_features, stream_rows, InsertAllRequest, TableReference};
//!
//! # async fn example(metadata: visionlog_core::VisitMetadata) -> visionlog_core::Result<()> {
//! let annotator = MockAnnotator::returning(BatchAnnotateImagesResponse::default());
//! let store = MockStore::new();
//!
//! let annotations = extract_features(&annotator, b"...image bytes...").await?;
//! let row = visionlog_core::project_row(annotations.first(), &metadata);
//! let request = InsertAllRequest::new(vec![row]);
//! stream_rows(&store, &TableReference::new("my-app", "demo", "vision"), Some(&request)).await?;
//! # Ok(())
//! # }
//! ```

pub mod bigquery;
pub mod error;
mod http;
pub mod mock;
pub mod provision;
pub mod row;
pub mod stream;
pub mod token;
pub mod user_agent;
pub mod vision;

// Re-export main types for convenience
pub use bigquery::{
    visit_table, AnalyticsStore, BigQueryClient, InsertAllRequest, InsertAllResponse, Table,
    TableReference,
};
pub use error::{Result, VisionLogError};
pub use http::DEFAULT_API_TIMEOUT;
pub use provision::ensure_table;
pub use row::{project_row, GeoInfo, LabelEntry, LabelType, UploadInfo, VisitMetadata, VisitRow};
pub use stream::{stream_rows, INSERT_RETRY_DELAY};
pub use token::AccessTokenSource;
pub use user_agent::UserAgentInfo;
pub use vision::{extract_features, ImageAnnotator, VisionClient};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockAnnotator, MockStore};
    use crate::vision::{AnnotateImageResponse, BatchAnnotateImagesResponse, EntityAnnotation};

    /// Annotate, project and stream one upload end to end against the mocks.
    #[tokio::test]
    async fn test_full_upload_workflow() {
        let annotator = MockAnnotator::returning(BatchAnnotateImagesResponse {
            responses: vec![AnnotateImageResponse {
                logo_annotations: vec![EntityAnnotation::new("Rustacean", 0.77)],
                ..Default::default()
            }],
        });
        let store = MockStore::new();
        let destination = TableReference::new("my-app", "demo", "vision");

        let annotations = extract_features(&annotator, b"image").await.unwrap();
        let metadata = VisitMetadata {
            user_id: "185804764220139124118".to_string(),
            time: chrono::Utc::now(),
            upload: UploadInfo {
                filename: "crab.png".to_string(),
                content_type: "image/png".to_string(),
                size: 5,
            },
            geo: GeoInfo::default(),
            user_agent: UserAgentInfo::parse("Mozilla/5.0 (X11; Linux x86_64)"),
        };
        let row = project_row(annotations.first(), &metadata);
        let request = InsertAllRequest::new(vec![row]);

        stream_rows(&store, &destination, Some(&request))
            .await
            .unwrap();

        let inserted = store.inserted();
        assert_eq!(inserted.len(), 1);
        let row = &inserted[0].rows[0];
        assert!(row.insert_id.is_some());
        assert_eq!(row.json.labels[0].label_type, LabelType::Logo);
        assert_eq!(row.json.platform, "X11");
        assert_eq!(row.json.os, "Linux x86_64");
    }
}
