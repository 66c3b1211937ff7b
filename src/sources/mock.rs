//! Mock source for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::normalize::RawWork;
use super::params::QueryParams;
use super::{Source, SourceError, WorksPage};

/// A mock source for testing that returns predefined responses.
///
/// Every request is recorded so tests can assert on the parameters sent.
#[derive(Debug, Default)]
pub struct MockSource {
    page: Mutex<Option<WorksPage>>,
    failure: Mutex<Option<SourceError>>,
    delays: Mutex<HashMap<String, Duration>>,
    requests: Mutex<Vec<QueryParams>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockSource {
    /// Create a new mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page to return.
    pub fn set_page(&self, page: WorksPage) {
        *locked(&self.page) = Some(page);
    }

    /// Make every search fail with `error` until cleared.
    pub fn set_failure(&self, error: SourceError) {
        *locked(&self.failure) = Some(error);
    }

    /// Clear the configured page and failure.
    pub fn clear_response(&self) {
        *locked(&self.page) = None;
        *locked(&self.failure) = None;
    }

    /// Delay responses for `query` by `delay`.
    pub fn set_delay(&self, query: impl Into<String>, delay: Duration) {
        locked(&self.delays).insert(query.into(), delay);
    }

    /// Parameters of every request received so far
    pub fn requests(&self) -> Vec<QueryParams> {
        locked(&self.requests).clone()
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    async fn search_works(&self, params: &QueryParams) -> Result<WorksPage, SourceError> {
        locked(&self.requests).push(params.clone());

        let delay = locked(&self.delays).get(&params.query).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = locked(&self.failure).clone() {
            return Err(error);
        }

        Ok(locked(&self.page).clone().unwrap_or_default())
    }
}

/// Helper function to create a raw work for testing.
pub fn make_work(doi: &str, title: &str, year: i32) -> RawWork {
    RawWork::from_value(serde_json::json!({
        "DOI": doi,
        "title": [title],
        "author": [{"given": "Test", "family": "Author"}],
        "published-print": {"date-parts": [[year]]},
        "is-referenced-by-count": 1
    }))
}
