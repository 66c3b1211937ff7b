//! Utility modules supporting search operations.
//!
//! - [`HttpClient`]: shared HTTP client with a polite CrossRef user agent
//! - [`SearchHistory`]: bounded, persisted log of submitted queries
//! - [`format_citation`]: APA, MLA, Chicago and BibTeX citations for a record
//! - [`display`]: plain-text layout helpers for terminal output
//!
//! # Search History
//!
//! ```rust
//! use crossref_search::utils::SearchHistory;
//!
//! let history = SearchHistory::in_memory(20);
//! history.record("graph neural networks");
//! assert_eq!(history.entries()[0].query, "graph neural networks");
//! ```

mod cite;
pub mod display;
mod history;
mod http;

pub use cite::{format_citation, CitationStyle};
pub use display::{terminal_width, truncate_with_ellipsis};
pub use history::{
    FileStore, HistoryEntry, KeyValueStore, MemoryStore, SearchHistory, StorageError,
    DEFAULT_HISTORY_CAPACITY, HISTORY_KEY,
};
pub use http::{polite_user_agent, HttpClient};
