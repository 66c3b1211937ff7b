//! The current search session as seen by a front end.

use super::{SearchController, SearchError, SearchSession, UserMessage};
use crate::models::{SearchFilters, SearchRequest, SortBy};
use crate::sources::Source;

/// Effect of an operation on [`SearchState`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new session replaced the current one
    Updated,
    /// Nothing changed: illegal transition, stale or superseded response
    Unchanged,
    /// The request was rejected or failed; show the message
    Notice(UserMessage),
}

/// Holds the session currently on display plus the filters for the next search.
///
/// Every fetch produces a fresh [`SearchSession`]; [`SearchState::apply`] is
/// the only place the current one is replaced.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    session: SearchSession,
    filters: SearchFilters,
    failed: Option<SearchRequest>,
}

impl SearchState {
    /// State whose next search uses `filters`
    pub fn new(filters: SearchFilters) -> Self {
        Self {
            filters,
            ..Default::default()
        }
    }

    pub fn session(&self) -> &SearchSession {
        &self.session
    }

    /// Filters used by the next [`search`](Self::search)
    pub fn filters(&self) -> &SearchFilters {
        &self.filters
    }

    /// Request that failed last, kept for [`retry`](Self::retry)
    pub fn failed_request(&self) -> Option<&SearchRequest> {
        self.failed.as_ref()
    }

    /// Fold the result of a fetch for `request` into the state
    pub fn apply(
        &mut self,
        request: SearchRequest,
        result: Result<SearchSession, SearchError>,
    ) -> Outcome {
        match result {
            Ok(session) => {
                if session.generation < self.session.generation {
                    tracing::debug!(generation = session.generation, "Dropping stale session");
                    return Outcome::Unchanged;
                }
                self.filters = session.filters.clone();
                self.session = session;
                self.failed = None;
                Outcome::Updated
            }
            Err(SearchError::Superseded) => Outcome::Unchanged,
            Err(err @ SearchError::Validation(_)) => notice(&err),
            Err(err) => {
                self.session = SearchSession::failed(&request, self.session.generation);
                self.failed = Some(request);
                notice(&err)
            }
        }
    }

    /// Start a new search with the current filters
    pub async fn search<S: Source + ?Sized>(
        &mut self,
        controller: &SearchController<S>,
        query: &str,
    ) -> Outcome {
        self.search_at(controller, query, 1).await
    }

    /// Start a new search that opens at `page`
    pub async fn search_at<S: Source + ?Sized>(
        &mut self,
        controller: &SearchController<S>,
        query: &str,
        page: u32,
    ) -> Outcome {
        let request = SearchRequest::new(query.trim(), self.filters.clone()).at_page(page);
        let result = controller
            .execute_search_at_page(query, &self.filters, page)
            .await;
        self.apply(request, result)
    }

    /// Move to the next page; no-op on the last page
    pub async fn next_page<S: Source + ?Sized>(
        &mut self,
        controller: &SearchController<S>,
    ) -> Outcome {
        match self.session.pagination.next() {
            Some(page) => self.fetch_page(controller, page).await,
            None => Outcome::Unchanged,
        }
    }

    /// Move to the previous page; no-op on page 1
    pub async fn previous_page<S: Source + ?Sized>(
        &mut self,
        controller: &SearchController<S>,
    ) -> Outcome {
        match self.session.pagination.previous() {
            Some(page) => self.fetch_page(controller, page).await,
            None => Outcome::Unchanged,
        }
    }

    /// Change the page size and go back to page 1, re-fetching only when a
    /// query is active
    pub async fn change_page_size<S: Source + ?Sized>(
        &mut self,
        controller: &SearchController<S>,
        size: u32,
    ) -> Outcome {
        let filters = self.filters.clone().results_per_page(size);
        if let Err(e) = filters.validate() {
            return notice(&SearchError::Validation(e.to_string()));
        }
        self.filters = filters;
        self.refresh(controller).await
    }

    /// Replace the filters used by the next search
    pub fn set_filters(&mut self, filters: SearchFilters) -> Outcome {
        match filters.validate() {
            Ok(()) => {
                self.filters = filters;
                Outcome::Unchanged
            }
            Err(e) => notice(&SearchError::Validation(e.to_string())),
        }
    }

    /// Drop both year bounds and re-run the active query
    pub async fn remove_year_filter<S: Source + ?Sized>(
        &mut self,
        controller: &SearchController<S>,
    ) -> Outcome {
        if !self.filters.has_year_range() {
            return Outcome::Unchanged;
        }
        self.filters.year_from = None;
        self.filters.year_to = None;
        self.refresh(controller).await
    }

    /// Go back to relevance ordering and re-run the active query
    pub async fn remove_sort_filter<S: Source + ?Sized>(
        &mut self,
        controller: &SearchController<S>,
    ) -> Outcome {
        if self.filters.sort_by == SortBy::Relevance {
            return Outcome::Unchanged;
        }
        self.filters.sort_by = SortBy::Relevance;
        self.refresh(controller).await
    }

    /// Repeat the last failed request, or reload the current page
    pub async fn retry<S: Source + ?Sized>(&mut self, controller: &SearchController<S>) -> Outcome {
        let request = match self.failed.clone() {
            Some(request) => request,
            None if self.session.is_active() => self.session.request(),
            None => return Outcome::Unchanged,
        };
        let result = controller.execute_search_with_current_params(&request).await;
        self.apply(request, result)
    }

    async fn fetch_page<S: Source + ?Sized>(
        &mut self,
        controller: &SearchController<S>,
        page: u32,
    ) -> Outcome {
        let request = self.session.request().at_page(page);
        let result = controller.execute_search_with_current_params(&request).await;
        self.apply(request, result)
    }

    async fn refresh<S: Source + ?Sized>(&mut self, controller: &SearchController<S>) -> Outcome {
        if !self.session.is_active() {
            return Outcome::Unchanged;
        }
        let request = SearchRequest::new(self.session.query.clone(), self.filters.clone());
        let result = controller.execute_search_with_current_params(&request).await;
        self.apply(request, result)
    }
}

fn notice(err: &SearchError) -> Outcome {
    err.user_message()
        .map_or(Outcome::Unchanged, Outcome::Notice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MessageCategory;
    use crate::sources::mock::make_work;
    use crate::sources::{MockSource, SourceError, WorksPage};
    use crate::utils::SearchHistory;
    use std::sync::Arc;
    use std::time::Duration;

    fn setup(total: u64) -> (Arc<MockSource>, SearchController<MockSource>) {
        let source = Arc::new(MockSource::new());
        source.set_page(WorksPage::new(vec![make_work("10.1/a", "A", 2020)], total));
        let controller =
            SearchController::new(Arc::clone(&source), Arc::new(SearchHistory::in_memory(20)));
        (source, controller)
    }

    #[tokio::test]
    async fn test_next_page_until_last() {
        let (source, controller) = setup(42);
        let mut state = SearchState::new(SearchFilters::new(20));

        assert_eq!(state.search(&controller, "graphs").await, Outcome::Updated);
        assert_eq!(state.session().total_pages(), 3);
        assert_eq!(state.previous_page(&controller).await, Outcome::Unchanged);

        state.next_page(&controller).await;
        state.next_page(&controller).await;
        assert_eq!(state.session().current_page(), 3);

        assert_eq!(state.next_page(&controller).await, Outcome::Unchanged);
        assert_eq!(source.requests().len(), 3);
        assert_eq!(source.requests()[2].offset, 40);
    }

    #[tokio::test]
    async fn test_validation_leaves_state_untouched() {
        let (source, controller) = setup(42);
        let mut state = SearchState::default();
        state.search(&controller, "graphs").await;
        let before = state.session().clone();

        let outcome = state.search(&controller, "  ").await;
        match outcome {
            Outcome::Notice(message) => {
                assert_eq!(message.category, MessageCategory::Validation)
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(state.session(), &before);
        assert_eq!(source.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_clears_results_and_keeps_request() {
        let (source, controller) = setup(42);
        let mut state = SearchState::new(SearchFilters::new(20));
        state.search(&controller, "graphs").await;
        state.next_page(&controller).await;

        source.set_failure(SourceError::Api {
            status: 500,
            status_text: "Internal Server Error".to_string(),
        });
        let outcome = state.next_page(&controller).await;
        assert!(matches!(outcome, Outcome::Notice(ref m) if m.category == MessageCategory::Api));

        let session = state.session();
        assert!(session.results.is_empty());
        assert_eq!(session.total_results, 0);
        assert_eq!(session.total_pages(), 0);
        assert_eq!(session.current_page(), 1);
        assert_eq!(session.query, "graphs");
        assert_eq!(state.failed_request().map(|r| r.page), Some(3));

        source.clear_response();
        source.set_page(WorksPage::new(vec![make_work("10.1/c", "C", 2021)], 42));
        assert_eq!(state.retry(&controller).await, Outcome::Updated);
        assert_eq!(state.session().current_page(), 3);
        assert!(state.failed_request().is_none());
    }

    #[tokio::test]
    async fn test_timeout_message() {
        let (source, controller) = setup(42);
        let controller = controller.timeout(Duration::from_millis(10));
        source.set_delay("slow", Duration::from_millis(200));
        let mut state = SearchState::default();

        let outcome = state.search(&controller, "slow").await;
        assert!(matches!(outcome, Outcome::Notice(ref m) if m.category == MessageCategory::Timeout));
        assert!(state.session().results.is_empty());
    }

    #[tokio::test]
    async fn test_change_page_size_without_query_does_not_fetch() {
        let (source, controller) = setup(42);
        let mut state = SearchState::default();

        assert_eq!(state.change_page_size(&controller, 50).await, Outcome::Unchanged);
        assert_eq!(state.filters().results_per_page, 50);
        assert!(source.requests().is_empty());

        let outcome = state.change_page_size(&controller, 0).await;
        assert!(matches!(outcome, Outcome::Notice(_)));
        assert_eq!(state.filters().results_per_page, 50);
    }

    #[tokio::test]
    async fn test_change_page_size_refetches_page_one() {
        let (source, controller) = setup(42);
        let mut state = SearchState::new(SearchFilters::new(10));
        state.search(&controller, "graphs").await;
        state.next_page(&controller).await;

        assert_eq!(state.change_page_size(&controller, 20).await, Outcome::Updated);
        assert_eq!(state.session().current_page(), 1);
        assert_eq!(state.session().total_pages(), 3);
        let last = source.requests().pop().unwrap();
        assert_eq!((last.rows, last.offset), (20, 0));
        assert_eq!(controller.history().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_filters() {
        let (source, controller) = setup(42);
        let filters = SearchFilters::default()
            .year_from(2020)
            .year_to(2023)
            .sort_by(SortBy::Newest);
        let mut state = SearchState::new(filters);
        state.search(&controller, "graphs").await;

        assert_eq!(state.remove_year_filter(&controller).await, Outcome::Updated);
        assert_eq!(source.requests().last().unwrap().filter, None);
        assert_eq!(state.session().filters.applied().len(), 1);

        assert_eq!(state.remove_sort_filter(&controller).await, Outcome::Updated);
        assert_eq!(source.requests().last().unwrap().sort, None);
        assert!(state.session().filters.applied().is_empty());

        assert_eq!(state.remove_sort_filter(&controller).await, Outcome::Unchanged);
    }

    #[test]
    fn test_stale_session_is_ignored() {
        let mut state = SearchState::default();
        let request = SearchRequest::new("q", SearchFilters::default());
        let newer = SearchSession {
            query: "newer".to_string(),
            generation: 5,
            ..Default::default()
        };
        let older = SearchSession {
            query: "older".to_string(),
            generation: 4,
            ..Default::default()
        };

        assert_eq!(state.apply(request.clone(), Ok(newer)), Outcome::Updated);
        assert_eq!(state.apply(request.clone(), Ok(older)), Outcome::Unchanged);
        assert_eq!(state.session().query, "newer");
        assert_eq!(state.apply(request, Err(SearchError::Superseded)), Outcome::Unchanged);
    }
}
