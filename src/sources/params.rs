//! Translation of a query plus filters into CrossRef `/works` request parameters.

use crate::models::{SearchFilters, SortBy};
use serde::Serialize;

/// Contact address sent with every request, which routes traffic to CrossRef's polite pool
pub const DEFAULT_MAILTO: &str = "crossref-search@users.noreply.github.com";

/// Fields requested from CrossRef; everything the normalizer reads
pub const SELECT_FIELDS: &str = "DOI,title,author,abstract,published-print,published-online,is-referenced-by-count,container-title,URL,link,subject";

/// Ordering direction for `order`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Encoded parameter set for one `/works` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryParams {
    pub query: String,
    pub rows: u32,
    pub offset: u64,
    pub mailto: String,
    pub select: &'static str,
    pub sort: Option<&'static str>,
    pub order: Option<SortOrder>,
    pub filter: Option<String>,
}

impl QueryParams {
    /// Build the parameters for `page` (1-based) of size `page_size`.
    ///
    /// Page 0 is treated as page 1, so the offset is never negative.
    pub fn build(query: &str, filters: &SearchFilters, page: u32, page_size: u32) -> Self {
        let offset = u64::from(page.max(1) - 1) * u64::from(page_size);

        let (sort, order) = match filters.sort_by {
            SortBy::Relevance => (None, None),
            SortBy::Newest => (Some("published"), Some(SortOrder::Desc)),
            SortBy::Oldest => (Some("published"), Some(SortOrder::Asc)),
            SortBy::Citations => (Some("is-referenced-by-count"), Some(SortOrder::Desc)),
        };

        Self {
            query: query.to_string(),
            rows: page_size,
            offset,
            mailto: DEFAULT_MAILTO.to_string(),
            select: SELECT_FIELDS,
            sort,
            order,
            filter: year_filter(filters.year_from, filters.year_to),
        }
    }

    /// Override the contact address
    pub fn mailto(mut self, mailto: impl Into<String>) -> Self {
        self.mailto = mailto.into();
        self
    }

    /// Parameters in wire order, ready for `RequestBuilder::query`
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("query", self.query.clone()),
            ("rows", self.rows.to_string()),
            ("offset", self.offset.to_string()),
            ("mailto", self.mailto.clone()),
            ("select", self.select.to_string()),
        ];
        if let Some(sort) = self.sort {
            pairs.push(("sort", sort.to_string()));
        }
        if let Some(order) = self.order {
            pairs.push(("order", order.as_str().to_string()));
        }
        if let Some(filter) = &self.filter {
            pairs.push(("filter", filter.clone()));
        }
        pairs
    }
}

/// `from-pub-date:<from>-<to>` with either bound allowed empty
fn year_filter(from: Option<i32>, to: Option<i32>) -> Option<String> {
    if from.is_none() && to.is_none() {
        return None;
    }
    let bound = |year: Option<i32>| year.map(|y| y.to_string()).unwrap_or_default();
    Some(format!("from-pub-date:{}-{}", bound(from), bound(to)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value<'a>(pairs: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_machine_learning_scenario() {
        let filters = SearchFilters::new(10)
            .year_from(2020)
            .year_to(2023)
            .sort_by(SortBy::Newest);
        let pairs = QueryParams::build("machine learning", &filters, 1, 10).to_pairs();

        assert_eq!(value(&pairs, "query"), Some("machine learning"));
        assert_eq!(value(&pairs, "offset"), Some("0"));
        assert_eq!(value(&pairs, "rows"), Some("10"));
        assert_eq!(value(&pairs, "sort"), Some("published"));
        assert_eq!(value(&pairs, "order"), Some("desc"));
        assert_eq!(value(&pairs, "filter"), Some("from-pub-date:2020-2023"));
        assert_eq!(value(&pairs, "mailto"), Some(DEFAULT_MAILTO));
        assert_eq!(value(&pairs, "select"), Some(SELECT_FIELDS));
    }

    #[test]
    fn test_offset_follows_page() {
        let filters = SearchFilters::new(20);
        assert_eq!(QueryParams::build("q", &filters, 3, 20).offset, 40);
        assert_eq!(QueryParams::build("q", &filters, 0, 20).offset, 0);
    }

    #[test]
    fn test_relevance_has_no_sort() {
        let params = QueryParams::build("q", &SearchFilters::default(), 1, 10);
        assert_eq!(params.sort, None);
        assert_eq!(params.order, None);
        let pairs = params.to_pairs();
        assert_eq!(value(&pairs, "sort"), None);
        assert_eq!(value(&pairs, "order"), None);
    }

    #[test]
    fn test_oldest_and_citations_sort() {
        let oldest = QueryParams::build("q", &SearchFilters::default().sort_by(SortBy::Oldest), 1, 10);
        assert_eq!(oldest.sort, Some("published"));
        assert_eq!(oldest.order, Some(SortOrder::Asc));

        let cited = QueryParams::build("q", &SearchFilters::default().sort_by(SortBy::Citations), 1, 10);
        assert_eq!(cited.sort, Some("is-referenced-by-count"));
        assert_eq!(cited.order, Some(SortOrder::Desc));
    }

    #[test]
    fn test_open_ended_year_filter() {
        let from_only = QueryParams::build("q", &SearchFilters::default().year_from(2010), 1, 10);
        assert_eq!(from_only.filter.as_deref(), Some("from-pub-date:2010-"));

        let to_only = QueryParams::build("q", &SearchFilters::default().year_to(2015), 1, 10);
        assert_eq!(to_only.filter.as_deref(), Some("from-pub-date:-2015"));

        let none = QueryParams::build("q", &SearchFilters::default(), 1, 10);
        assert_eq!(none.filter, None);
    }

    #[test]
    fn test_mailto_override() {
        let params = QueryParams::build("q", &SearchFilters::default(), 1, 10).mailto("me@example.org");
        assert_eq!(params.mailto, "me@example.org");
    }
}
