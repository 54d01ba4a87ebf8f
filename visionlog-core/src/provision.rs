//! Idempotent creation of the destination dataset and table.

use tracing::{debug, error, info};

use crate::bigquery::{AnalyticsStore, Table};
use crate::error::{Result, VisionLogError};

/// Make sure the dataset and then the table described by `table` exist.
///
/// An incomplete descriptor is rejected before any call. "Already exists"
/// answers count as success; any other failure stops provisioning.
pub async fn ensure_table(store: &dyn AnalyticsStore, table: Option<&Table>) -> Result<()> {
    let table = table.ok_or(VisionLogError::UndefinedTable)?;
    let reference = table
        .table_reference
        .as_ref()
        .ok_or(VisionLogError::UndefinedTableReference)?;
    if table.schema.is_none() {
        return Err(VisionLogError::UndefinedSchema);
    }

    match store.create_dataset(&reference.dataset()).await {
        Ok(()) => info!(dataset = %reference.dataset_id, "Dataset created"),
        Err(e) if e.is_already_exists() => {
            debug!(dataset = %reference.dataset_id, "Dataset already exists")
        }
        Err(e) => {
            error!(error = %e, "There was an error while creating dataset");
            return Err(e);
        }
    }

    match store.create_table(table, reference).await {
        Ok(()) => info!(table = %reference, "Table created"),
        Err(e) if e.is_already_exists() => debug!(table = %reference, "Table already exists"),
        Err(e) => {
            error!(error = %e, "There was an error while creating table");
            return Err(e);
        }
    }

    Ok(())
}
