//! reqwest client for `images:annotate`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::{BatchAnnotateImagesRequest, BatchAnnotateImagesResponse, ImageAnnotator};
use crate::error::Result;
use crate::http::json_or_error;
use crate::token::AccessTokenSource;

/// Default Vision API base URL.
pub const DEFAULT_VISION_API_URL: &str = "https://vision.googleapis.com/v1";

pub struct VisionClient {
    client: Client,
    base_url: String,
    tokens: Arc<AccessTokenSource>,
}

impl VisionClient {
    pub fn new(client: Client, base_url: impl Into<String>, tokens: Arc<AccessTokenSource>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }
}

#[async_trait]
impl ImageAnnotator for VisionClient {
    #[instrument(level = "debug", skip_all, fields(images = batch.requests.len()))]
    async fn annotate(
        &self,
        batch: &BatchAnnotateImagesRequest,
    ) -> Result<BatchAnnotateImagesResponse> {
        let token = self.tokens.token().await?;
        let url = format!("{}/images:annotate", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(batch)
            .send()
            .await?;
        debug!(status = %response.status(), "Received annotate response");

        json_or_error("Vision", response).await
    }
}
