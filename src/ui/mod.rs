//! CLI UI utilities for terminal output.
//!
//! This module provides colored output, a loading spinner and the styled
//! rendering of result pages, details views and the search history.

use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

use crate::models::PaperRecord;
use crate::session::{MessageCategory, SearchSession, UserMessage};
use crate::utils::display::{
    abstract_excerpt, card_meta, detail_sections, empty_state, filter_tags, navigation_hint,
    page_info, results_heading, stats_line, truncate_with_ellipsis,
};
use crate::utils::{CitationStyle, HistoryEntry};

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Search => "🔍",
    }
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Search,
}

/// Print a styled status message to stderr.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => eprintln!("{} {}", icon.green().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
        Status::Warning => eprintln!("{} {}", icon.yellow().bold(), msg),
        Status::Info => eprintln!("{} {}", icon.cyan().bold(), msg),
        Status::Search => eprintln!("{} {}", icon.yellow(), msg),
    }
}

/// Print a message produced by a failed or rejected search.
pub fn print_notice(message: &UserMessage) {
    let status = match message.category {
        MessageCategory::Validation | MessageCategory::Timeout => Status::Warning,
        MessageCategory::Api => Status::Error,
    };
    print_status(status, &message.text);
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Print a divider line.
pub fn print_divider(width: usize) {
    println!("{}", "─".repeat(width.min(80)).dimmed());
}

/// Print a page of results: heading, stats, filters, cards and pagination.
pub fn print_results(session: &SearchSession, width: usize) {
    println!();
    println!(
        "{} {}",
        status_icon(Status::Search).yellow().bold(),
        results_heading(&session.query).cyan().bold()
    );
    println!("{}", stats_line(session).dimmed());

    let tags = filter_tags(session);
    if !tags.is_empty() {
        println!("{}", tags.magenta());
    }

    if session.results.is_empty() {
        let (title, hint) = empty_state();
        println!();
        println!("  {}", title.bold());
        println!("  {}", hint.dimmed());
        return;
    }

    for (index, record) in session.results.iter().enumerate() {
        print_paper_card(index + 1, record, width);
    }

    println!();
    print_divider(width);
    let hint = navigation_hint(session);
    if hint.is_empty() {
        println!("{}", page_info(session).bold());
    } else {
        println!("{}  {}", page_info(session).bold(), hint.dimmed());
    }
}

/// Print one result card, numbered for the `d <i>` and `c <i>` commands.
pub fn print_paper_card(index: usize, record: &PaperRecord, width: usize) {
    let inner = width.saturating_sub(6).max(20);

    println!();
    println!(
        "{} {}",
        format!("{:>3}.", index).dimmed(),
        truncate_with_ellipsis(&record.title, inner).blue().bold()
    );
    println!("     {}", truncate_with_ellipsis(&record.authors, inner).green());
    println!("     {}", abstract_excerpt(record, inner));
    println!("     {}", card_meta(record, inner).yellow());
}

/// Print the full details view of a record.
pub fn print_details(record: &PaperRecord) {
    print_section("Paper Details");
    for (label, value) in detail_sections(record) {
        println!("{}", label.bold().cyan());
        println!("  {}", value);
    }
    println!();
}

/// Print a formatted citation.
pub fn print_citation(style: CitationStyle, citation: &str) {
    print_section(&format!("Citation ({})", style));
    println!("{}", citation);
    println!();
}

/// Build the history table, most recent first.
pub fn history_table(entries: &[HistoryEntry], width: usize) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(u16::try_from(width).unwrap_or(u16::MAX))
        .set_header(vec!["#", "Query", "Searched At"]);

    for (index, entry) in entries.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(&entry.query).add_attribute(Attribute::Bold),
            Cell::new(&entry.timestamp),
        ]);
    }
    table
}

/// Print the search history, or a note when it is empty.
pub fn print_history(entries: &[HistoryEntry], width: usize) {
    if entries.is_empty() {
        print_status(Status::Info, "No searches recorded yet");
        return;
    }
    println!("{}", history_table(entries, width));
}

/// Loading spinner shown while a request is in flight.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    /// Create a new spinner with the given message.
    pub fn new(msg: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    /// A spinner that draws nothing, for quiet or non-terminal output.
    pub fn hidden() -> Self {
        Self {
            pb: ProgressBar::hidden(),
        }
    }

    /// Set the message.
    pub fn set_message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }

    /// Remove the spinner from the terminal.
    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.pb.is_finished() {
            self.pb.finish_and_clear();
        }
    }
}
