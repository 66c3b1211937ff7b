//! Core data models for paper records and search requests.

mod paper;
mod search;

pub use paper::{
    doi_url, PaperRecord, PublicationYear, NO_ABSTRACT, NO_DOI, UNKNOWN_AUTHORS,
    UNKNOWN_JOURNAL, UNTITLED,
};
pub use search::{
    AppliedFilter, FilterError, FilterKind, SearchFilters, SearchRequest, SortBy,
    DEFAULT_RESULTS_PER_PAGE, MAX_RESULTS_PER_PAGE,
};
