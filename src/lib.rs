//! # CrossRef Search
//!
//! Search the CrossRef works index for scholarly papers, page through the
//! results and keep a history of recent queries.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (PaperRecord, SearchFilters, SearchRequest)
//! - [`sources`]: The works index behind a [`Source`] trait, request parameters and normalization
//! - [`session`]: Search controller, pagination and the caller-held search state
//! - [`utils`]: HTTP client, search history, citations and display helpers
//! - [`ui`]: Colored terminal rendering
//! - [`config`]: Configuration management

pub mod config;
pub mod models;
pub mod session;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{PaperRecord, SearchFilters, SearchRequest, SortBy};
pub use session::{SearchController, SearchError, SearchSession, SearchState};
pub use sources::{CrossRefSource, Source};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
