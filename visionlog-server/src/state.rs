//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use visionlog_core::{AnalyticsStore, ImageAnnotator, TableReference};

use crate::auth::IdentityProvider;
use crate::config::Config;

/// Deployment settings the handlers read on every request.
#[derive(Debug, Clone)]
pub struct AppSettings {
    /// Project id derived from the default hostname
    pub project_id: String,
    /// Version shown on the landing page
    pub version_id: String,
    pub dataset_id: String,
    pub table_id: String,
    /// Largest accepted `select_files` payload in bytes
    pub max_upload_bytes: usize,
}

impl AppSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            project_id: config.project_id(),
            version_id: config.version_id.clone(),
            dataset_id: config.dataset_id.clone(),
            table_id: config.table_id.clone(),
            max_upload_bytes: config.max_upload_mb * 1024 * 1024,
        }
    }

    /// Destination of the visit rows.
    pub fn visit_table_reference(&self) -> TableReference {
        TableReference::new(&self.project_id, &self.dataset_id, &self.table_id)
    }

    /// BigQuery console landing page for the project.
    pub fn console_url(&self) -> String {
        format!("https://bigquery.cloud.google.com/welcome/{}", self.project_id)
    }
}

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Session lookup and login URLs
    pub identity: Arc<dyn IdentityProvider>,
    /// Vision backend
    pub annotator: Arc<dyn ImageAnnotator>,
    /// BigQuery backend
    pub store: Arc<dyn AnalyticsStore>,
    pub settings: Arc<AppSettings>,
}

impl AppState {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        annotator: Arc<dyn ImageAnnotator>,
        store: Arc<dyn AnalyticsStore>,
        settings: AppSettings,
    ) -> Self {
        Self {
            identity,
            annotator,
            store,
            settings: Arc::new(settings),
        }
    }
}
