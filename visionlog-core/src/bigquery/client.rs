//! reqwest client for the BigQuery v2 REST API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::IgnoredAny;
use tracing::{debug, instrument};

use super::{
    AnalyticsStore, Dataset, DatasetReference, InsertAllRequest, InsertAllResponse, Table,
    TableReference,
};
use crate::error::Result;
use crate::http::json_or_error;
use crate::token::AccessTokenSource;

/// Default BigQuery API base URL.
pub const DEFAULT_BIGQUERY_API_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

const SERVICE: &str = "BigQuery";

pub struct BigQueryClient {
    client: Client,
    base_url: String,
    tokens: Arc<AccessTokenSource>,
}

impl BigQueryClient {
    pub fn new(client: Client, base_url: impl Into<String>, tokens: Arc<AccessTokenSource>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    async fn post<B, T>(&self, url: String, body: &B) -> Result<T>
    where
        B: serde::Serialize + Sync,
        T: serde::de::DeserializeOwned + Send,
    {
        let token = self.tokens.token().await?;
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        debug!(url = %url, status = %response.status(), "BigQuery response");

        json_or_error(SERVICE, response).await
    }
}

#[async_trait]
impl AnalyticsStore for BigQueryClient {
    #[instrument(level = "debug", skip_all, fields(dataset = %dataset.dataset_id))]
    async fn create_dataset(&self, dataset: &DatasetReference) -> Result<()> {
        let url = format!("{}/projects/{}/datasets", self.base_url, dataset.project_id);
        let body = Dataset {
            dataset_reference: dataset.clone(),
        };
        let _: IgnoredAny = self.post(url, &body).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(table = %reference))]
    async fn create_table(&self, table: &Table, reference: &TableReference) -> Result<()> {
        let url = format!(
            "{}/projects/{}/datasets/{}/tables",
            self.base_url, reference.project_id, reference.dataset_id
        );
        let _: IgnoredAny = self.post(url, table).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(table = %destination, rows = request.rows.len()))]
    async fn insert_all(
        &self,
        destination: &TableReference,
        request: &InsertAllRequest,
    ) -> Result<InsertAllResponse> {
        let url = format!(
            "{}/projects/{}/datasets/{}/tables/{}/insertAll",
            self.base_url, destination.project_id, destination.dataset_id, destination.table_id
        );
        self.post(url, request).await
    }
}
