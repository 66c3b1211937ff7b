//! Search lifecycle: validation, fetching, error classification and paging.
//!
//! [`SearchController`] runs individual fetches and returns a fresh
//! [`SearchSession`] value for each one. [`SearchState`] is the slot a front
//! end keeps the current session in; it applies results, drops stale ones and
//! drives page transitions.

mod pagination;
mod state;

pub use pagination::{total_pages, Pagination};
pub use state::{Outcome, SearchState};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::models::{PaperRecord, SearchFilters, SearchRequest};
use crate::sources::{
    normalize_page, normalize_work, QueryParams, Source, SourceError, WorksPage, DEFAULT_MAILTO,
};
use crate::utils::SearchHistory;

/// Deadline for one search request
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Results of one successful fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSession {
    /// Query that produced the results
    pub query: String,

    /// Filters in effect
    pub filters: SearchFilters,

    /// Page position
    #[serde(flatten)]
    pub pagination: Pagination,

    /// Total matches reported by the API
    pub total_results: u64,

    /// Normalized records of the current page
    pub results: Vec<PaperRecord>,

    /// Controller ticket of the fetch that produced this session
    pub generation: u64,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self {
            query: String::new(),
            filters: SearchFilters::default(),
            pagination: Pagination::first(),
            total_results: 0,
            results: Vec::new(),
            generation: 0,
        }
    }
}

impl SearchSession {
    /// Session left behind by a failed request: no results, zero totals
    pub fn failed(request: &SearchRequest, generation: u64) -> Self {
        Self {
            query: request.query.clone(),
            filters: request.filters.clone(),
            generation,
            ..Default::default()
        }
    }

    /// Whether a query has been issued
    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    pub fn current_page(&self) -> u32 {
        self.pagination.current_page()
    }

    pub fn total_pages(&self) -> u32 {
        self.pagination.total_pages()
    }

    /// Request that reproduces this session
    pub fn request(&self) -> SearchRequest {
        SearchRequest {
            query: self.query.clone(),
            filters: self.filters.clone(),
            page: self.current_page(),
        }
    }

    /// 1-based range of the records shown, `(0, 0)` when empty
    pub fn display_range(&self) -> (u64, u64) {
        self.pagination
            .display_range(self.filters.results_per_page, self.results.len())
    }
}

/// User-facing error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageCategory {
    Validation,
    Timeout,
    Api,
}

/// Message shown to the user after a failed or rejected search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    pub category: MessageCategory,
    pub text: String,
}

/// Errors from the search path
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// Input rejected before any request was made
    #[error("{0}")]
    Validation(String),

    /// Request exceeded the configured deadline
    #[error("Request timed out after {after:?}")]
    Timeout { after: Duration },

    /// Non-success HTTP status
    #[error("API error: {status} {status_text}")]
    Api { status: u16, status_text: String },

    /// Connection-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed response body
    #[error("Parse error: {0}")]
    Parse(String),

    /// The source cannot perform the operation
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// A newer request replaced this one
    #[error("Superseded by a newer search")]
    Superseded,
}

impl SearchError {
    fn from_source(err: SourceError, timeout: Duration) -> Self {
        match err {
            SourceError::Api {
                status,
                status_text,
            } => SearchError::Api {
                status,
                status_text,
            },
            SourceError::Timeout => SearchError::Timeout { after: timeout },
            SourceError::Network(msg) => SearchError::Network(msg),
            SourceError::Parse(msg) => SearchError::Parse(msg),
            SourceError::NotFound(what) => SearchError::Api {
                status: 404,
                status_text: format!("Not Found: {}", what),
            },
            SourceError::NotImplemented => {
                SearchError::Unsupported("operation not implemented for this source".to_string())
            }
        }
    }

    /// Category shown to the user; `None` for superseded requests
    pub fn category(&self) -> Option<MessageCategory> {
        match self {
            SearchError::Validation(_) => Some(MessageCategory::Validation),
            SearchError::Timeout { .. } => Some(MessageCategory::Timeout),
            SearchError::Api { .. }
            | SearchError::Network(_)
            | SearchError::Parse(_)
            | SearchError::Unsupported(_) => Some(MessageCategory::Api),
            SearchError::Superseded => None,
        }
    }

    /// User-facing message; superseded requests produce none
    pub fn user_message(&self) -> Option<UserMessage> {
        let text = match self {
            SearchError::Validation(msg) => msg.clone(),
            SearchError::Timeout { after } => format!(
                "The search timed out after {} seconds. Please try again.",
                after.as_secs_f32()
            ),
            SearchError::Api {
                status,
                status_text,
            } => {
                let status_line = format!("{} {}", status, status_text);
                format!(
                    "Search failed: CrossRef returned {}. Please try again later.",
                    status_line.trim_end()
                )
            }
            SearchError::Network(_) => {
                "Could not reach CrossRef. Check your connection and try again.".to_string()
            }
            SearchError::Parse(_) => {
                "Search failed: CrossRef sent a response that could not be read.".to_string()
            }
            SearchError::Unsupported(_) => {
                "This operation is not supported by the current source.".to_string()
            }
            SearchError::Superseded => return None,
        };
        Some(UserMessage {
            category: self.category()?,
            text,
        })
    }
}

/// Runs searches against a [`Source`].
///
/// Each fetch takes a new ticket. Publishing a ticket cancels every fetch
/// holding an older one, so at most one request per controller is in flight
/// and a late answer to a replaced request is never returned as a result.
#[derive(Debug)]
pub struct SearchController<S: Source + ?Sized> {
    source: Arc<S>,
    history: Arc<SearchHistory>,
    timeout: Duration,
    mailto: String,
    latest: watch::Sender<u64>,
}

impl<S: Source + ?Sized> SearchController<S> {
    pub fn new(source: Arc<S>, history: Arc<SearchHistory>) -> Self {
        let (latest, _) = watch::channel(0);
        Self {
            source,
            history,
            timeout: DEFAULT_SEARCH_TIMEOUT,
            mailto: DEFAULT_MAILTO.to_string(),
            latest,
        }
    }

    /// Set the per-request deadline
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the contact address sent with each request
    pub fn mailto(mut self, mailto: impl Into<String>) -> Self {
        self.mailto = mailto.into();
        self
    }

    pub fn history(&self) -> &SearchHistory {
        &self.history
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Start a new search at page 1.
    ///
    /// The trimmed query is recorded in the history before the request is sent.
    pub async fn execute_search(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<SearchSession, SearchError> {
        self.execute_search_at_page(query, filters, 1).await
    }

    /// Start a new search directly at `page`, recording it like
    /// [`execute_search`](Self::execute_search)
    pub async fn execute_search_at_page(
        &self,
        query: &str,
        filters: &SearchFilters,
        page: u32,
    ) -> Result<SearchSession, SearchError> {
        let request = SearchRequest::new(query.trim(), filters.clone()).at_page(page);
        validate(&request)?;

        self.history.record(&request.query);
        self.fetch(&request).await
    }

    /// Repeat a query with its filters, typically at another page
    pub async fn execute_search_with_current_params(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchSession, SearchError> {
        validate(request)?;
        self.fetch(request).await
    }

    /// Fetch and normalize a single work by DOI
    pub async fn lookup_doi(&self, doi: &str) -> Result<PaperRecord, SearchError> {
        let doi = doi.trim();
        if doi.is_empty() {
            return Err(SearchError::Validation("Please enter a DOI".to_string()));
        }

        match tokio::time::timeout(self.timeout, self.source.work_by_doi(doi)).await {
            Err(_) => Err(SearchError::Timeout {
                after: self.timeout,
            }),
            Ok(Err(e)) => Err(SearchError::from_source(e, self.timeout)),
            Ok(Ok(work)) => Ok(normalize_work(&work, 0)),
        }
    }

    async fn fetch(&self, request: &SearchRequest) -> Result<SearchSession, SearchError> {
        let mut generation = 0;
        self.latest.send_modify(|latest| {
            *latest += 1;
            generation = *latest;
        });
        let mut latest = self.latest.subscribe();

        let page_size = request.filters.results_per_page;
        let mut fetched_page = request.page.max(1);
        let mut params = self.params_for(request, fetched_page);
        let mut page = self.fetch_works(&params, &request.query, &mut latest, generation).await?;

        let last_page = total_pages(page.total_results, page_size);
        if last_page > 0 && request.page > last_page {
            tracing::debug!(
                requested = request.page,
                last_page,
                "Requested page is past the end, fetching the last page"
            );
            fetched_page = last_page;
            params = self.params_for(request, fetched_page);
            page = self.fetch_works(&params, &request.query, &mut latest, generation).await?;
        }

        let results = normalize_page(&page.items, params.offset);
        let pagination = Pagination::new(fetched_page, page.total_results, page_size);

        tracing::info!(
            query = %request.query,
            page = pagination.current_page(),
            total_pages = pagination.total_pages(),
            total_results = page.total_results,
            "Search returned {} results",
            results.len()
        );

        Ok(SearchSession {
            query: request.query.clone(),
            filters: request.filters.clone(),
            pagination,
            total_results: page.total_results,
            results,
            generation,
        })
    }

    fn params_for(&self, request: &SearchRequest, page: u32) -> QueryParams {
        QueryParams::build(
            &request.query,
            &request.filters,
            page,
            request.filters.results_per_page,
        )
        .mailto(self.mailto.as_str())
    }

    /// One source round trip, bounded by the timeout and cancelled by newer tickets
    async fn fetch_works(
        &self,
        params: &QueryParams,
        query: &str,
        latest: &mut watch::Receiver<u64>,
        generation: u64,
    ) -> Result<WorksPage, SearchError> {
        let outcome = tokio::select! {
            outcome = tokio::time::timeout(self.timeout, self.source.search_works(params)) => outcome,
            _ = superseded(latest, generation) => {
                tracing::debug!(generation, query = %query, "Search cancelled by a newer one");
                return Err(SearchError::Superseded);
            }
        };

        if *self.latest.borrow() != generation {
            return Err(SearchError::Superseded);
        }

        match outcome {
            Err(_) => {
                tracing::warn!(query = %query, "Search timed out after {:?}", self.timeout);
                Err(SearchError::Timeout {
                    after: self.timeout,
                })
            }
            Ok(Err(e)) => {
                tracing::warn!(query = %query, "Search failed: {}", e);
                Err(SearchError::from_source(e, self.timeout))
            }
            Ok(Ok(page)) => Ok(page),
        }
    }
}

fn validate(request: &SearchRequest) -> Result<(), SearchError> {
    if request.query.trim().is_empty() {
        return Err(SearchError::Validation(
            "Please enter a search term".to_string(),
        ));
    }
    request
        .filters
        .validate()
        .map_err(|e| SearchError::Validation(e.to_string()))
}

/// Resolves once a ticket newer than `generation` has been published
async fn superseded(latest: &mut watch::Receiver<u64>, generation: u64) {
    while *latest.borrow_and_update() == generation {
        if latest.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
