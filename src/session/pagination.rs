//! Page bookkeeping for a result set.

use serde::{Deserialize, Serialize};

/// Current page and page count of a result set.
///
/// `current_page` always lies in `1..=max(1, total_pages)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    current_page: u32,
    total_pages: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::first()
    }
}

impl Pagination {
    /// Page 1 of an empty result set
    pub fn first() -> Self {
        Self {
            current_page: 1,
            total_pages: 0,
        }
    }

    /// Pagination for `total_results` split into pages of `page_size`,
    /// with `page` clamped into range.
    pub fn new(page: u32, total_results: u64, page_size: u32) -> Self {
        let total_pages = total_pages(total_results, page_size);
        Self {
            current_page: page.clamp(1, total_pages.max(1)),
            total_pages,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// Target page of a "previous" transition, if legal
    pub fn previous(&self) -> Option<u32> {
        self.has_previous().then(|| self.current_page - 1)
    }

    /// Target page of a "next" transition, if legal
    pub fn next(&self) -> Option<u32> {
        self.has_next().then(|| self.current_page + 1)
    }

    /// 1-based `(start, end)` of the `shown` items on this page.
    ///
    /// Returns `(0, 0)` when nothing is shown.
    pub fn display_range(&self, page_size: u32, shown: usize) -> (u64, u64) {
        if shown == 0 {
            return (0, 0);
        }
        let start = u64::from(self.current_page - 1) * u64::from(page_size) + 1;
        (start, start + shown as u64 - 1)
    }
}

/// `ceil(total_results / page_size)`, saturating at `u32::MAX`
pub fn total_pages(total_results: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    u32::try_from(total_results.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX)
}
