//! In-process stand-ins for the Vision and BigQuery backends.
//!
//! WARNING: for tests and local demos only. Nothing is analyzed or stored.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::bigquery::{
    AnalyticsStore, DatasetReference, InsertAllRequest, InsertAllResponse, Table, TableReference,
};
use crate::error::{Result, VisionLogError};
use crate::vision::{BatchAnnotateImagesRequest, BatchAnnotateImagesResponse, ImageAnnotator};

/// Annotator answering every batch with the same canned result.
pub struct MockAnnotator {
    outcome: std::result::Result<BatchAnnotateImagesResponse, String>,
    requests: Mutex<Vec<BatchAnnotateImagesRequest>>,
}

impl MockAnnotator {
    pub fn returning(response: BatchAnnotateImagesResponse) -> Self {
        Self {
            outcome: Ok(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with an upstream error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Batches received so far.
    pub fn requests(&self) -> Vec<BatchAnnotateImagesRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl ImageAnnotator for MockAnnotator {
    async fn annotate(
        &self,
        batch: &BatchAnnotateImagesRequest,
    ) -> Result<BatchAnnotateImagesResponse> {
        lock(&self.requests).push(batch.clone());
        match &self.outcome {
            Ok(response) => Ok(response.clone()),
            Err(message) => Err(VisionLogError::Upstream {
                service: "Vision",
                status: 500,
                message: message.clone(),
            }),
        }
    }
}

/// Call recorded by [`MockStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    CreateDataset {
        project_id: String,
        dataset_id: String,
    },
    CreateTable {
        reference: String,
    },
    InsertAll {
        destination: String,
        request: InsertAllRequest,
    },
}

/// Store replaying scripted outcomes per operation, succeeding once a
/// script runs out.
#[derive(Default)]
pub struct MockStore {
    create_dataset: Mutex<VecDeque<Result<()>>>,
    create_table: Mutex<VecDeque<Result<()>>>,
    insert_all: Mutex<VecDeque<Result<InsertAllResponse>>>,
    calls: Mutex<Vec<StoreCall>>,
    insert_times: Mutex<Vec<tokio::time::Instant>>,
    insert_delay: Mutex<Duration>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_create_dataset(&self, outcome: Result<()>) {
        lock(&self.create_dataset).push_back(outcome);
    }

    pub fn push_create_table(&self, outcome: Result<()>) {
        lock(&self.create_table).push_back(outcome);
    }

    pub fn push_insert(&self, outcome: Result<InsertAllResponse>) {
        lock(&self.insert_all).push_back(outcome);
    }

    /// Time every `insertAll` call takes before answering.
    pub fn set_insert_delay(&self, delay: Duration) {
        *lock(&self.insert_delay) = delay;
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.calls).clone()
    }

    /// Rows of every `insertAll` call, in order.
    pub fn inserted(&self) -> Vec<InsertAllRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::InsertAll { request, .. } => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Tokio clock reading at each `insertAll` call.
    pub fn insert_times(&self) -> Vec<tokio::time::Instant> {
        lock(&self.insert_times).clone()
    }
}

#[async_trait]
impl AnalyticsStore for MockStore {
    async fn create_dataset(&self, dataset: &DatasetReference) -> Result<()> {
        lock(&self.calls).push(StoreCall::CreateDataset {
            project_id: dataset.project_id.clone(),
            dataset_id: dataset.dataset_id.clone(),
        });
        lock(&self.create_dataset).pop_front().unwrap_or(Ok(()))
    }

    async fn create_table(&self, _table: &Table, reference: &TableReference) -> Result<()> {
        lock(&self.calls).push(StoreCall::CreateTable {
            reference: reference.to_string(),
        });
        lock(&self.create_table).pop_front().unwrap_or(Ok(()))
    }

    async fn insert_all(
        &self,
        destination: &TableReference,
        request: &InsertAllRequest,
    ) -> Result<InsertAllResponse> {
        lock(&self.calls).push(StoreCall::InsertAll {
            destination: destination.to_string(),
            request: request.clone(),
        });
        lock(&self.insert_times).push(tokio::time::Instant::now());
        let delay = *lock(&self.insert_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        lock(&self.insert_all)
            .pop_front()
            .unwrap_or_else(|| Ok(InsertAllResponse::default()))
    }
}

/// Lock ignoring poisoning; a panicking test already failed.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
