//! Flattening of annotations and request metadata into one visit row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user_agent::UserAgentInfo;
use crate::vision::AnnotateImageResponse;

/// Kind of annotation a label entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelType {
    Label,
    Landmark,
    Logo,
    Text,
}

/// One element of the repeated `Labels` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LabelEntry {
    #[serde(rename = "Type")]
    pub label_type: LabelType,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// Geo headers added by the hosting front end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoInfo {
    pub country: String,
    pub region: String,
    pub city: String,
}

/// The uploaded file, as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadInfo {
    pub filename: String,
    pub content_type: String,
    pub size: usize,
}

/// Everything about the visit that does not come from the annotations.
#[derive(Debug, Clone)]
pub struct VisitMetadata {
    pub user_id: String,
    pub time: DateTime<Utc>,
    pub upload: UploadInfo,
    pub geo: GeoInfo,
    pub user_agent: UserAgentInfo,
}

/// One row of the visit table. Field names are the table's column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VisitRow {
    pub user: String,
    pub time: DateTime<Utc>,
    pub labels: Vec<LabelEntry>,
    pub filename: String,
    pub content_type: String,
    pub size: usize,
    pub country: String,
    pub region: String,
    pub city: String,
    pub is_mobile: bool,
    pub mozilla_version: String,
    pub platform: String,
    #[serde(rename = "OS")]
    pub os: String,
    pub engine_name: String,
    pub engine_version: String,
    pub browser_name: String,
    pub browser_version: String,
    pub user_agent: String,
}

/// Typed label entries for one image's annotations.
///
/// Labels, landmarks and logos keep their order and score. Only the first
/// text annotation is kept: it holds the full detected text, the following
/// ones repeat it word by word.
pub fn project_labels(annotations: &AnnotateImageResponse) -> Vec<LabelEntry> {
    let scored = [
        (LabelType::Label, &annotations.label_annotations),
        (LabelType::Landmark, &annotations.landmark_annotations),
        (LabelType::Logo, &annotations.logo_annotations),
    ];

    let mut labels: Vec<LabelEntry> = scored
        .into_iter()
        .flat_map(|(label_type, entries)| {
            entries.iter().map(move |a| LabelEntry {
                label_type,
                label: a.description.clone(),
                score: Some(a.score),
            })
        })
        .collect();

    if let Some(text) = annotations.text_annotations.first() {
        labels.push(LabelEntry {
            label_type: LabelType::Text,
            label: text.description.clone(),
            score: None,
        });
    }

    labels
}

/// Build the visit row. `annotations` is `None` when the batch came back empty.
pub fn project_row(
    annotations: Option<&AnnotateImageResponse>,
    metadata: &VisitMetadata,
) -> VisitRow {
    let labels = annotations.map(project_labels).unwrap_or_default();
    let ua = &metadata.user_agent;

    VisitRow {
        user: metadata.user_id.clone(),
        time: metadata.time,
        labels,
        filename: metadata.upload.filename.clone(),
        content_type: metadata.upload.content_type.clone(),
        size: metadata.upload.size,
        country: metadata.geo.country.clone(),
        region: metadata.geo.region.clone(),
        city: metadata.geo.city.clone(),
        is_mobile: ua.mobile,
        mozilla_version: ua.mozilla_version.clone(),
        platform: ua.platform.clone(),
        os: ua.os.clone(),
        engine_name: ua.engine_name.clone(),
        engine_version: ua.engine_version.clone(),
        browser_name: ua.browser_name.clone(),
        browser_version: ua.browser_version.clone(),
        user_agent: ua.raw.clone(),
    }
}
