//! Streaming of visit rows into BigQuery.
//!
//! A failed `insertAll` call is retried exactly once after a fixed delay.
//! Rows rejected by the store are not retried: they are logged one by one and
//! reported as [`VisionLogError::StreamingFailed`].

use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::future::retry_notify;
use tracing::{debug, error, warn};

use crate::bigquery::{AnalyticsStore, InsertAllRequest, InsertAllResponse, TableReference};
use crate::error::{Result, VisionLogError};

/// Pause before the single retry of a failed insert.
pub const INSERT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Backoff that allows one retry after `delay`, then gives up.
#[derive(Debug, Clone)]
pub struct SingleRetry {
    delay: Duration,
    used: bool,
}

impl SingleRetry {
    pub fn new(delay: Duration) -> Self {
        Self { delay, used: false }
    }
}

impl Default for SingleRetry {
    fn default() -> Self {
        Self::new(INSERT_RETRY_DELAY)
    }
}

impl Backoff for SingleRetry {
    fn reset(&mut self) {
        self.used = false;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.used {
            None
        } else {
            self.used = true;
            Some(self.delay)
        }
    }
}

/// Stream `request` into `destination`.
///
/// Returns `NoInsertRequest` without calling the store when `request` is
/// `None`, the second transport error when both attempts fail, and
/// `StreamingFailed` when the store answered but rejected at least one row.
pub async fn stream_rows(
    store: &dyn AnalyticsStore,
    destination: &TableReference,
    request: Option<&InsertAllRequest>,
) -> Result<()> {
    let request = request.ok_or(VisionLogError::NoInsertRequest)?;

    let mut attempt = 0u32;
    let response = retry_notify(
        SingleRetry::default(),
        || {
            attempt += 1;
            let current = attempt;
            async move {
                let response = store
                    .insert_all(destination, request)
                    .await
                    .map_err(backoff::Error::transient)?;
                if current > 1 {
                    debug!(table = %destination, "2nd try was successful");
                }
                Ok(response)
            }
        },
        |err: VisionLogError, duration: Duration| {
            warn!(
                error = %err,
                table = %destination,
                retry_after_secs = duration.as_secs(),
                "Error streaming data to BigQuery, trying again"
            );
        },
    )
    .await
    .map_err(|e| {
        error!(error = %e, table = %destination, "Error again streaming data to BigQuery");
        log_request(request);
        e
    })?;

    if has_row_errors(&response) {
        log_request(request);
        return Err(VisionLogError::StreamingFailed);
    }

    Ok(())
}

/// Log every non-empty per-row error and report whether there was any.
pub fn has_row_errors(response: &InsertAllResponse) -> bool {
    let mut failed = false;
    for (i, row) in response.insert_errors.iter().enumerate() {
        for (j, e) in row.errors.iter().enumerate() {
            if e.is_error() {
                error!(
                    row = i,
                    row_index = row.index,
                    error_index = j,
                    reason = %e.reason,
                    message = %e.message,
                    debug_info = %e.debug_info,
                    "BigQuery rejected row"
                );
                failed = true;
            }
        }
    }
    failed
}

fn log_request(request: &InsertAllRequest) {
    match serde_json::to_string(request) {
        Ok(json) => debug!(request = %json, "Failed insert request"),
        Err(e) => debug!(error = %e, "Failed insert request could not be serialized"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bigquery::{ErrorProto, RowInsertErrors};
    use crate::mock::{MockStore, StoreCall};
    use crate::row::{project_row, UploadInfo, VisitMetadata};
    use crate::user_agent::UserAgentInfo;

    fn destination() -> TableReference {
        TableReference::new("my-app", "demo", "vision")
    }

    fn request() -> InsertAllRequest {
        let row = project_row(
            None,
            &VisitMetadata {
                user_id: "42".to_string(),
                time: chrono::Utc::now(),
                upload: UploadInfo::default(),
                geo: Default::default(),
                user_agent: UserAgentInfo::default(),
            },
        );
        InsertAllRequest::new(vec![row])
    }

    fn rejected(index: u32, error: ErrorProto) -> RowInsertErrors {
        RowInsertErrors {
            index,
            errors: vec![error],
        }
    }

    /// Log output of the current thread, captured at debug level.
    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn install(&self) -> tracing::subscriber::DefaultGuard {
            let writer = self.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(tracing::Level::DEBUG)
                .with_ansi(false)
                .with_writer(move || writer.clone())
                .finish();
            tracing::subscriber::set_default(subscriber)
        }

        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn insert_attempts(store: &MockStore) -> usize {
        store
            .calls()
            .iter()
            .filter(|c| matches!(c, StoreCall::InsertAll { .. }))
            .count()
    }

    #[test]
    fn test_single_retry_backoff() {
        let mut backoff = SingleRetry::new(Duration::from_secs(10));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(10)));
        assert_eq!(backoff.next_backoff(), None);
        backoff.reset();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_missing_request_makes_no_call() {
        let store = MockStore::new();

        let err = stream_rows(&store, &destination(), None).await.unwrap_err();

        assert!(matches!(err, VisionLogError::NoInsertRequest));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_clean_outcome_is_success() {
        let store = MockStore::new();
        store.push_insert(Ok(InsertAllResponse {
            insert_errors: vec![RowInsertErrors {
                index: 0,
                errors: vec![ErrorProto::default()],
            }],
        }));

        stream_rows(&store, &destination(), Some(&request()))
            .await
            .unwrap();
        assert_eq!(insert_attempts(&store), 1);
    }

    #[tokio::test]
    async fn test_any_row_error_fails_the_whole_insert() {
        let store = MockStore::new();
        store.push_insert(Ok(InsertAllResponse {
            insert_errors: vec![
                RowInsertErrors::default(),
                rejected(
                    1,
                    ErrorProto {
                        reason: "invalid".to_string(),
                        message: "no such field: Colour".to_string(),
                        ..Default::default()
                    },
                ),
                RowInsertErrors::default(),
            ],
        }));

        let err = stream_rows(&store, &destination(), Some(&request()))
            .await
            .unwrap_err();

        assert!(matches!(err, VisionLogError::StreamingFailed));
        // Row rejections are not retried
        assert_eq!(insert_attempts(&store), 1);
    }

    #[tokio::test]
    async fn test_debug_info_alone_marks_failure() {
        let store = MockStore::new();
        store.push_insert(Ok(InsertAllResponse {
            insert_errors: vec![rejected(
                0,
                ErrorProto {
                    debug_info: "backend detail".to_string(),
                    ..Default::default()
                },
            )],
        }));

        let err = stream_rows(&store, &destination(), Some(&request()))
            .await
            .unwrap_err();
        assert!(matches!(err, VisionLogError::StreamingFailed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_retried_once_after_fixed_delay() {
        let store = MockStore::new();
        store.push_insert(Err(VisionLogError::Upstream {
            service: "BigQuery",
            status: 503,
            message: "backend error".to_string(),
        }));
        store.push_insert(Ok(InsertAllResponse::default()));

        stream_rows(&store, &destination(), Some(&request()))
            .await
            .unwrap();

        let times = store.insert_times();
        assert_eq!(times.len(), 2);
        assert_eq!(times[1] - times[0], INSERT_RETRY_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_failure_is_propagated_without_third_attempt() {
        let store = MockStore::new();
        store.push_insert(Err(VisionLogError::Upstream {
            service: "BigQuery",
            status: 503,
            message: "first".to_string(),
        }));
        store.push_insert(Err(VisionLogError::Upstream {
            service: "BigQuery",
            status: 500,
            message: "second".to_string(),
        }));
        store.push_insert(Ok(InsertAllResponse::default()));

        let err = stream_rows(&store, &destination(), Some(&request()))
            .await
            .unwrap_err();

        match err {
            VisionLogError::Upstream {
                status, message, ..
            } => {
                assert_eq!(status, 500);
                assert_eq!(message, "second");
            }
            other => panic!("Expected second Upstream error, got: {:?}", other),
        }
        assert_eq!(insert_attempts(&store), 2);
    }

    #[tokio::test]
    async fn test_rejected_rows_log_the_request() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let store = MockStore::new();
        store.push_insert(Ok(InsertAllResponse {
            insert_errors: vec![rejected(
                0,
                ErrorProto {
                    reason: "invalid".to_string(),
                    ..Default::default()
                },
            )],
        }));

        stream_rows(&store, &destination(), Some(&request()))
            .await
            .unwrap_err();

        let text = logs.text();
        assert!(text.contains("Failed insert request"));
        assert!(text.contains("bigquery#tableDataInsertAllRequest"));
        assert!(text.contains("insertId"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_failure_logs_the_request() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let store = MockStore::new();
        for _ in 0..2 {
            store.push_insert(Err(VisionLogError::Upstream {
                service: "BigQuery",
                status: 503,
                message: "backend error".to_string(),
            }));
        }

        stream_rows(&store, &destination(), Some(&request()))
            .await
            .unwrap_err();

        let text = logs.text();
        assert!(text.contains("Error again streaming data to BigQuery"));
        assert!(text.contains("Failed insert request"));
        assert!(text.contains("\"User\":\"42\""));
    }

    #[tokio::test]
    async fn test_success_does_not_log_the_request() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let store = MockStore::new();

        stream_rows(&store, &destination(), Some(&request()))
            .await
            .unwrap();

        assert!(!logs.text().contains("Failed insert request"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_row_errors_after_retry_still_fail() {
        let store = MockStore::new();
        store.push_insert(Err(VisionLogError::Token("metadata timeout".to_string())));
        store.push_insert(Ok(InsertAllResponse {
            insert_errors: vec![rejected(
                0,
                ErrorProto {
                    reason: "stopped".to_string(),
                    ..Default::default()
                },
            )],
        }));

        let err = stream_rows(&store, &destination(), Some(&request()))
            .await
            .unwrap_err();
        assert!(matches!(err, VisionLogError::StreamingFailed));
        assert_eq!(insert_attempts(&store), 2);
    }
}
