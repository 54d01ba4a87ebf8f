//! Image feature extraction through the Vision API.
//!
//! Every upload is annotated with the same fixed detector list:
//! labels (10), landmarks (5), logos (5) and text (1).

mod client;
mod types;

pub use client::{VisionClient, DEFAULT_VISION_API_URL};
pub use types::{
    AnnotateImageRequest, AnnotateImageResponse, BatchAnnotateImagesRequest,
    BatchAnnotateImagesResponse, EntityAnnotation, Feature, FeatureType, Image, Status,
    TextAnnotation,
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::{debug, error};

use crate::error::{Result, VisionLogError};

/// Detectors requested for every image, with their result caps.
pub const FEATURES: [(FeatureType, u32); 4] = [
    (FeatureType::LabelDetection, 10),
    (FeatureType::LandmarkDetection, 5),
    (FeatureType::LogoDetection, 5),
    (FeatureType::TextDetection, 1),
];

/// Backend able to annotate a batch of images.
///
/// Implementations must be thread-safe (`Send + Sync`); one instance is shared
/// by all requests.
#[async_trait]
pub trait ImageAnnotator: Send + Sync {
    /// Run the batch. Transport and service failures are returned as errors.
    async fn annotate(&self, batch: &BatchAnnotateImagesRequest)
        -> Result<BatchAnnotateImagesResponse>;
}

/// Build the single-image request carrying the fixed feature list.
pub fn build_annotate_request(image_bytes: &[u8]) -> AnnotateImageRequest {
    AnnotateImageRequest {
        image: Image {
            content: BASE64.encode(image_bytes),
        },
        features: FEATURES
            .iter()
            .map(|&(feature_type, max_results)| Feature {
                feature_type,
                max_results,
            })
            .collect(),
    }
}

/// Annotate raw image bytes. No retry: the first failure is returned.
pub async fn extract_features(
    annotator: &dyn ImageAnnotator,
    image_bytes: &[u8],
) -> Result<BatchAnnotateImagesResponse> {
    let request = build_annotate_request(image_bytes);
    let batch = BatchAnnotateImagesRequest {
        requests: vec![request],
    };

    let response = match annotator.annotate(&batch).await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "Error executing annotate");
            log_request(&batch);
            return Err(e);
        }
    };

    if let Some(status) = response.first().and_then(|r| r.error.as_ref()) {
        error!(code = status.code, message = %status.message, "Image rejected by annotate");
        log_request(&batch);
        return Err(VisionLogError::Annotation {
            code: status.code,
            message: status.message.clone(),
        });
    }

    Ok(response)
}

fn log_request(batch: &BatchAnnotateImagesRequest) {
    let redacted = BatchAnnotateImagesRequest {
        requests: batch.requests.iter().map(|r| r.redacted()).collect(),
    };
    match serde_json::to_string(&redacted) {
        Ok(json) => debug!(request = %json, "Failed annotate request"),
        Err(e) => debug!(error = %e, "Failed annotate request could not be serialized"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockAnnotator;

    #[test]
    fn test_request_has_fixed_features() {
        let request = build_annotate_request(b"hello");
        assert_eq!(request.image.content, "aGVsbG8=");

        let caps: Vec<_> = request
            .features
            .iter()
            .map(|f| (f.feature_type, f.max_results))
            .collect();
        assert_eq!(
            caps,
            vec![
                (FeatureType::LabelDetection, 10),
                (FeatureType::LandmarkDetection, 5),
                (FeatureType::LogoDetection, 5),
                (FeatureType::TextDetection, 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_extract_sends_single_image_batch() {
        let annotator = MockAnnotator::returning(BatchAnnotateImagesResponse::default());

        extract_features(&annotator, b"\x89PNG").await.unwrap();

        let batches = annotator.requests();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].requests.len(), 1);
        assert_eq!(batches[0].requests[0].image.content, BASE64.encode(b"\x89PNG"));
    }

    #[tokio::test]
    async fn test_extract_propagates_failure_without_retry() {
        let annotator = MockAnnotator::failing("quota exceeded");

        let err = extract_features(&annotator, b"img").await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(annotator.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_extract_surfaces_image_error() {
        let annotator = MockAnnotator::returning(BatchAnnotateImagesResponse {
            responses: vec![AnnotateImageResponse {
                error: Some(Status {
                    code: 3,
                    message: "Bad image data.".to_string(),
                }),
                ..Default::default()
            }],
        });

        let err = extract_features(&annotator, b"not an image").await.unwrap_err();
        match err {
            VisionLogError::Annotation { code, message } => {
                assert_eq!(code, 3);
                assert_eq!(message, "Bad image data.");
            }
            other => panic!("Expected Annotation error, got: {:?}", other),
        }
    }
}
