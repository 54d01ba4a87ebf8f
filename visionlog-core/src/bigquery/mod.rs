//! BigQuery access: resource records, the fixed visit table and the REST client.

mod client;
mod schema;
mod types;

pub use client::{BigQueryClient, DEFAULT_BIGQUERY_API_URL};
pub use schema::{visit_table, visit_table_schema, VISIT_TABLE_FRIENDLY_NAME};
pub use types::{
    Dataset, DatasetReference, ErrorProto, FieldMode, FieldType, InsertAllRequest,
    InsertAllResponse, InsertRow, RowInsertErrors, Table, TableFieldSchema, TableReference,
    TableSchema, INSERT_ALL_KIND,
};

use async_trait::async_trait;

use crate::error::Result;

/// The three analytical-store operations this application needs.
///
/// Create calls report "already exists" as an error for which
/// [`crate::VisionLogError::is_already_exists`] is true.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn create_dataset(&self, dataset: &DatasetReference) -> Result<()>;

    async fn create_table(&self, table: &Table, reference: &TableReference) -> Result<()>;

    /// Streaming insert. Rejected rows come back in the response, not as an error.
    async fn insert_all(
        &self,
        destination: &TableReference,
        request: &InsertAllRequest,
    ) -> Result<InsertAllResponse>;
}
