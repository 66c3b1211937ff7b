//! Search filter and request models.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest page size CrossRef accepts for `rows`
pub const MAX_RESULTS_PER_PAGE: u32 = 1000;

/// Default page size
pub const DEFAULT_RESULTS_PER_PAGE: u32 = 10;

/// Result ordering requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// API default ordering
    #[default]
    Relevance,
    Newest,
    Oldest,
    Citations,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::Newest => "newest",
            SortBy::Oldest => "oldest",
            SortBy::Citations => "citations",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter set applied to a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    /// Earliest publication year (inclusive)
    pub year_from: Option<i32>,

    /// Latest publication year (inclusive)
    pub year_to: Option<i32>,

    /// Result ordering
    pub sort_by: SortBy,

    /// Page size
    pub results_per_page: u32,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            year_from: None,
            year_to: None,
            sort_by: SortBy::Relevance,
            results_per_page: DEFAULT_RESULTS_PER_PAGE,
        }
    }
}

impl SearchFilters {
    /// Create filters with the given page size
    pub fn new(results_per_page: u32) -> Self {
        Self {
            results_per_page,
            ..Default::default()
        }
    }

    /// Set the lower year bound
    pub fn year_from(mut self, year: i32) -> Self {
        self.year_from = Some(year);
        self
    }

    /// Set the upper year bound
    pub fn year_to(mut self, year: i32) -> Self {
        self.year_to = Some(year);
        self
    }

    /// Set the sort order
    pub fn sort_by(mut self, sort: SortBy) -> Self {
        self.sort_by = sort;
        self
    }

    /// Set the page size
    pub fn results_per_page(mut self, size: u32) -> Self {
        self.results_per_page = size;
        self
    }

    /// Whether either year bound is set
    pub fn has_year_range(&self) -> bool {
        self.year_from.is_some() || self.year_to.is_some()
    }

    /// Check the filter invariants before a request is built
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.results_per_page == 0 || self.results_per_page > MAX_RESULTS_PER_PAGE {
            return Err(FilterError::PageSize(self.results_per_page));
        }
        let years = [self.year_from, self.year_to];
        if let Some(year) = years.into_iter().flatten().find(|year| *year < 0) {
            return Err(FilterError::NegativeYear(year));
        }
        if let (Some(from), Some(to)) = (self.year_from, self.year_to) {
            if from > to {
                return Err(FilterError::YearRange { from, to });
            }
        }
        Ok(())
    }

    /// Filters that differ from the defaults, as removable tags
    pub fn applied(&self) -> Vec<AppliedFilter> {
        let mut tags = Vec::new();

        if self.has_year_range() {
            let bound = |year: Option<i32>| year.map_or_else(|| "Any".to_string(), |y| y.to_string());
            tags.push(AppliedFilter {
                kind: FilterKind::YearRange,
                label: format!("Years: {} - {}", bound(self.year_from), bound(self.year_to)),
            });
        }

        if self.sort_by != SortBy::Relevance {
            tags.push(AppliedFilter {
                kind: FilterKind::Sort,
                label: format!("Sorted by: {}", self.sort_by),
            });
        }

        tags
    }
}

/// Invalid filter combinations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("Results per page must be between 1 and {MAX_RESULTS_PER_PAGE}, got {0}")]
    PageSize(u32),

    #[error("Years must not be negative, got {0}")]
    NegativeYear(i32),

    #[error("Year range start {from} is after its end {to}")]
    YearRange { from: i32, to: i32 },
}

/// Which filter a tag represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    YearRange,
    Sort,
}

/// A filter shown to the user as a removable tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedFilter {
    pub kind: FilterKind,
    pub label: String,
}

/// Everything needed to fetch one page of results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Trimmed free-text query
    pub query: String,

    /// Filters in effect
    pub filters: SearchFilters,

    /// 1-based page number
    pub page: u32,
}

impl SearchRequest {
    /// Request for the first page
    pub fn new(query: impl Into<String>, filters: SearchFilters) -> Self {
        Self {
            query: query.into(),
            filters,
            page: 1,
        }
    }

    /// Same query and filters at another page
    pub fn at_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }
}
