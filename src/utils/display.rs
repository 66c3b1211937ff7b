//! Terminal display utilities for CLI output formatting.
//!
//! Everything here produces plain strings; styling is applied by [`crate::ui`].
//! Widths are measured in terminal columns, so wide characters are handled.

use std::io::{self, IsTerminal};
use std::sync::OnceLock;
use terminal_size::terminal_size;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::models::{PaperRecord, NO_DOI};
use crate::session::SearchSession;

/// Default width when terminal size cannot be determined.
pub const DEFAULT_WIDTH: usize = 100;

/// Width reserved for the abstract excerpt on a result card
pub const ABSTRACT_EXCERPT_WIDTH: usize = 300;

/// Terminal information with cached size and capabilities.
#[derive(Debug, Clone)]
pub struct Terminal {
    width: usize,
    is_tty: bool,
}

static TERMINAL_INFO: OnceLock<Terminal> = OnceLock::new();

/// Get the global terminal information, initialized on first call.
pub fn terminal_info() -> &'static Terminal {
    TERMINAL_INFO.get_or_init(|| Terminal {
        width: terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(DEFAULT_WIDTH),
        is_tty: io::stdout().is_terminal(),
    })
}

/// Get the current terminal width in characters.
#[inline]
pub fn terminal_width() -> usize {
    terminal_info().width
}

/// Check if stdout is a terminal.
#[inline]
pub fn is_terminal() -> bool {
    terminal_info().is_tty
}

/// Truncate text to fit within `max_width` columns, appending an ellipsis if
/// truncation occurred.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if text.width() <= max_width {
        return text.to_string();
    }

    let budget = max_width.saturating_sub(3);
    let mut used = 0;
    let mut truncated = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(1);
        if used + w > budget {
            break;
        }
        used += w;
        truncated.push(c);
    }
    format!("{}...", truncated)
}

/// Truncate at the last word boundary that fits, falling back to
/// [`truncate_with_ellipsis`] when there is none.
pub fn truncate_at_word(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }

    let cut = truncate_with_ellipsis(text, max_width);
    let prefix = cut.trim_end_matches("...");
    match prefix.rfind(' ') {
        Some(space) if space > 0 => format!("{}...", prefix[..space].trim_end()),
        _ => cut,
    }
}

/// Results heading, e.g. `Search Results for "graphs"`
pub fn results_heading(query: &str) -> String {
    format!("Search Results for \"{}\"", query)
}

/// Stats line, e.g. `Showing 41-42 of 42 papers`
pub fn stats_line(session: &SearchSession) -> String {
    let (start, end) = session.display_range();
    format!("Showing {}-{} of {} papers", start, end, session.total_results)
}

/// Empty-state title and hint
pub fn empty_state() -> (&'static str, &'static str) {
    (
        "No Results Found",
        "Try different keywords or adjust your filters.",
    )
}

/// `Page N of M`
pub fn page_info(session: &SearchSession) -> String {
    format!(
        "Page {} of {}",
        session.current_page(),
        session.total_pages().max(1)
    )
}

/// Navigation hints for the current page
pub fn navigation_hint(session: &SearchSession) -> String {
    let mut hints = Vec::new();
    if session.pagination.has_previous() {
        hints.push("p: previous");
    }
    if session.pagination.has_next() {
        hints.push("n: next");
    }
    hints.join("  ")
}

/// Applied-filter tags, e.g. `[Years: 2020 - Any] [Sorted by: newest]`
pub fn filter_tags(session: &SearchSession) -> String {
    session
        .filters
        .applied()
        .iter()
        .map(|tag| format!("[{}]", tag.label))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Meta line of a card: year, citations and journal
pub fn card_meta(record: &PaperRecord, max_width: usize) -> String {
    let meta = format!(
        "{} | {} citations | {}",
        record.year, record.citation_count, record.journal
    );
    truncate_with_ellipsis(&meta, max_width)
}

/// Abstract excerpt shown on a result card
pub fn abstract_excerpt(record: &PaperRecord, max_width: usize) -> String {
    truncate_at_word(&record.r#abstract, max_width.min(ABSTRACT_EXCERPT_WIDTH))
}

/// Labelled sections of the details view, in display order
pub fn detail_sections(record: &PaperRecord) -> Vec<(&'static str, String)> {
    let mut sections = vec![
        ("Title", record.title.clone()),
        ("Authors", record.authors.clone()),
        ("Abstract", record.r#abstract.clone()),
        ("Year", record.year.to_string()),
        ("Citations", record.citation_count.to_string()),
        ("Journal", record.journal.clone()),
        (
            "DOI",
            if record.has_doi() {
                record.doi.clone()
            } else {
                NO_DOI.to_string()
            },
        ),
    ];
    if !record.subjects.is_empty() {
        sections.push(("Subjects", record.subjects.join(", ")));
    }
    if record.has_pdf() {
        sections.push(("PDF", record.pdf_url.clone()));
    }
    if !record.url.is_empty() {
        sections.push(("Source Page", record.url.clone()));
    }
    sections
}

/// Single plain-text line for a record, used by the plain output format
pub fn plain_line(record: &PaperRecord) -> String {
    format!("{} - {} ({})", record.title, record.authors, record.year)
}
