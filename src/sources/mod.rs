//! The works index behind a search, abstracted as a [`Source`].
//!
//! [`CrossRefSource`] talks to the CrossRef REST API; [`MockSource`] serves
//! canned pages for tests. Both hand back raw items, which the session
//! controller normalizes with [`normalize_page`].
//!
//! - [`params`]: query parameter builder
//! - [`normalize`]: raw item to [`PaperRecord`](crate::models::PaperRecord) mapping

mod crossref;
pub mod mock;
pub mod normalize;
pub mod params;

pub use crossref::{CrossRefSource, CROSSREF_API_BASE};
pub use mock::MockSource;
pub use normalize::{normalize_page, normalize_work, strip_markup, RawWork};
pub use params::{QueryParams, SortOrder, DEFAULT_MAILTO, SELECT_FIELDS};

use async_trait::async_trait;

/// One page of raw results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorksPage {
    /// Items in API order
    pub items: Vec<RawWork>,

    /// Total number of matches reported by the API
    pub total_results: u64,
}

impl WorksPage {
    pub fn new(items: Vec<RawWork>, total_results: u64) -> Self {
        Self {
            items,
            total_results,
        }
    }
}

/// A searchable index of scholarly works.
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Fetch one page of works
    async fn search_works(&self, params: &QueryParams) -> Result<WorksPage, SourceError>;

    /// Look up a single work by DOI
    async fn work_by_doi(&self, _doi: &str) -> Result<RawWork, SourceError> {
        Err(SourceError::NotImplemented)
    }
}

/// Errors that can occur when interacting with a source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The requested operation is not implemented for this source
    #[error("Operation not implemented for this source")]
    NotImplemented,

    /// Non-success HTTP status
    #[error("API returned {status} {status_text}")]
    Api { status: u16, status_text: String },

    /// Request exceeded its deadline
    #[error("Request timed out")]
    Timeout,

    /// Connection, DNS or TLS failure
    #[error("Network error: {0}")]
    Network(String),

    /// Response body was not the expected JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// Work not found
    #[error("Work not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}
