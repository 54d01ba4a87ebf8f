//! Request and response records of the Vision `images:annotate` call.

use serde::{Deserialize, Serialize};

/// Detector requested from the Vision API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureType {
    LabelDetection,
    LandmarkDetection,
    LogoDetection,
    TextDetection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    #[serde(rename = "type")]
    pub feature_type: FeatureType,
    pub max_results: u32,
}

/// Inline image payload, base64 encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotateImageRequest {
    pub image: Image,
    pub features: Vec<Feature>,
}

impl AnnotateImageRequest {
    /// Copy of the request suitable for logs: image content replaced by its length.
    pub fn redacted(&self) -> Self {
        Self {
            image: Image {
                content: format!("<{} base64 chars>", self.image.content.len()),
            },
            features: self.features.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAnnotateImagesRequest {
    pub requests: Vec<AnnotateImageRequest>,
}

/// Label, landmark or logo detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityAnnotation {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub score: f32,
}

impl EntityAnnotation {
    pub fn new(description: impl Into<String>, score: f32) -> Self {
        Self {
            description: description.into(),
            score,
        }
    }
}

/// OCR result. The first entry holds the full text, the rest single words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnnotation {
    #[serde(default)]
    pub description: String,
}

impl TextAnnotation {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// Per-image failure reported inside an otherwise successful batch call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// Annotations for one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateImageResponse {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_annotations: Vec<EntityAnnotation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub landmark_annotations: Vec<EntityAnnotation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logo_annotations: Vec<EntityAnnotation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_annotations: Vec<TextAnnotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Status>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchAnnotateImagesResponse {
    #[serde(default)]
    pub responses: Vec<AnnotateImageResponse>,
}

impl BatchAnnotateImagesResponse {
    /// Annotations of the first (and only) image of the batch.
    pub fn first(&self) -> Option<&AnnotateImageResponse> {
        self.responses.first()
    }
}
