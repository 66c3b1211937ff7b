//! Citation formatting in various styles.
//!
//! Supports APA 7th, MLA 9th, Chicago 17th (author-date), and BibTeX formats.

use crate::models::{PaperRecord, UNKNOWN_JOURNAL};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Citation style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationStyle {
    /// APA 7th edition
    #[default]
    Apa,
    /// MLA 9th edition
    Mla,
    /// Chicago 17th edition (author-date)
    Chicago,
    /// BibTeX
    Bibtex,
}

impl FromStr for CitationStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "apa" => Ok(CitationStyle::Apa),
            "mla" => Ok(CitationStyle::Mla),
            "chicago" => Ok(CitationStyle::Chicago),
            "bibtex" | "bib" => Ok(CitationStyle::Bibtex),
            other => Err(format!(
                "unknown citation style '{}' (expected apa, mla, chicago or bibtex)",
                other
            )),
        }
    }
}

impl fmt::Display for CitationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CitationStyle::Apa => write!(f, "APA 7th"),
            CitationStyle::Mla => write!(f, "MLA 9th"),
            CitationStyle::Chicago => write!(f, "Chicago 17th"),
            CitationStyle::Bibtex => write!(f, "BibTeX"),
        }
    }
}

/// Format a record's citation in the specified style
pub fn format_citation(record: &PaperRecord, style: CitationStyle) -> String {
    match style {
        CitationStyle::Apa => format_apa(record),
        CitationStyle::Mla => format_mla(record),
        CitationStyle::Chicago => format_chicago(record),
        CitationStyle::Bibtex => format_bibtex(record),
    }
}

/// Split "Given Family" into (family, given)
fn split_name(name: &str) -> (&str, &str) {
    match name.trim().rsplit_once(' ') {
        Some((given, family)) => (family, given.trim()),
        None => (name.trim(), ""),
    }
}

fn initials(given: &str) -> String {
    given
        .split([' ', '-'])
        .filter_map(|part| part.chars().next())
        .map(|c| format!("{}.", c))
        .collect::<Vec<_>>()
        .join(" ")
}

/// "Family, G." or just the family name
fn apa_name(name: &str) -> String {
    match split_name(name) {
        (family, "") => family.to_string(),
        (family, given) => format!("{}, {}", family, initials(given)),
    }
}

/// "Family, Given" or just the family name
fn inverted_name(name: &str) -> String {
    match split_name(name) {
        (family, "") => family.to_string(),
        (family, given) => format!("{}, {}", family, given),
    }
}

/// Format authors as "Family, G., Family, G., & Family, G."
fn format_authors_apa(authors: &[&str]) -> String {
    let formatted: Vec<String> = authors.iter().take(20).map(|a| apa_name(a)).collect();
    match formatted.as_slice() {
        [] => "Anonymous".to_string(),
        [one] => one.clone(),
        [first, second] => format!("{}, & {}", first, second),
        [rest @ .., last] if authors.len() > 20 => format!("{}, ... {}", rest.join(", "), last),
        [rest @ .., last] => format!("{}, & {}", rest.join(", "), last),
    }
}

/// Format authors as "Family, Given", "Family, Given, and Given Family", or "Family, Given, et al"
fn format_authors_mla(authors: &[&str]) -> String {
    match authors {
        [] => "Anonymous".to_string(),
        [one] => inverted_name(one),
        [first, second] => format!("{}, and {}", inverted_name(first), second.trim()),
        [first, ..] => format!("{}, et al", inverted_name(first)),
    }
}

/// Format authors as "Family, Given, Given Family, and Given Family"
fn format_authors_chicago(authors: &[&str]) -> String {
    match authors {
        [] => "Anonymous".to_string(),
        [one] => inverted_name(one),
        [first, second] => format!("{}, and {}", inverted_name(first), second.trim()),
        [first, middle @ .., last] if authors.len() <= 10 => {
            let mut names = vec![inverted_name(first)];
            names.extend(middle.iter().map(|a| a.trim().to_string()));
            format!("{}, and {}", names.join(", "), last.trim())
        }
        [first, ..] => format!("{}, et al.", inverted_name(first)),
    }
}

fn year_or_nd(record: &PaperRecord) -> String {
    record
        .year
        .value()
        .map_or_else(|| "n.d.".to_string(), |y| y.to_string())
}

fn journal(record: &PaperRecord) -> Option<&str> {
    (record.journal != UNKNOWN_JOURNAL && !record.journal.is_empty()).then_some(record.journal.as_str())
}

/// Terminate with a period unless the text already ends in punctuation
fn sentence(text: &str) -> String {
    if text.ends_with(['.', '?', '!']) {
        text.to_string()
    } else {
        format!("{}.", text)
    }
}

/// Format in APA 7th edition
/// Format: Author, A. A., & Author, B. B. (Year). Title. Journal. https://doi.org/DOI
fn format_apa(record: &PaperRecord) -> String {
    let mut parts = vec![
        sentence(&format_authors_apa(&record.author_list())),
        format!("({}).", year_or_nd(record)),
        sentence(&record.title),
    ];
    if let Some(journal) = journal(record) {
        parts.push(sentence(journal));
    }
    if let Some(link) = record.doi_link() {
        parts.push(link);
    }
    parts.join(" ")
}

/// Format in MLA 9th edition
/// Format: Author. "Title." Journal, Year, https://doi.org/DOI.
fn format_mla(record: &PaperRecord) -> String {
    let mut tail = Vec::new();
    if let Some(journal) = journal(record) {
        tail.push(journal.to_string());
    }
    tail.push(year_or_nd(record));
    if let Some(link) = record.doi_link() {
        tail.push(link);
    }

    format!(
        "{} \"{}\" {}",
        sentence(&format_authors_mla(&record.author_list())),
        sentence(&record.title),
        sentence(&tail.join(", "))
    )
}

/// Format in Chicago 17th edition (author-date)
/// Format: Author. Year. "Title." Journal. https://doi.org/DOI.
fn format_chicago(record: &PaperRecord) -> String {
    let mut parts = vec![
        sentence(&format_authors_chicago(&record.author_list())),
        sentence(&year_or_nd(record)),
        format!("\"{}\"", sentence(&record.title)),
    ];
    if let Some(journal) = journal(record) {
        parts.push(sentence(journal));
    }
    if let Some(link) = record.doi_link() {
        parts.push(sentence(&link));
    }
    parts.join(" ")
}

/// Generate a BibTeX entry keyed by first author family name, year and the
/// first title words
fn format_bibtex(record: &PaperRecord) -> String {
    let authors = record.author_list();
    let family = authors.first().map_or("anonymous", |a| split_name(a).0);
    let year = record.year.value().map(|y| y.to_string());
    let title_key: String = record
        .title
        .split_whitespace()
        .take(3)
        .flat_map(|w| w.chars().filter(|c| c.is_alphanumeric()))
        .collect();
    let key = format!(
        "{}{}{}",
        family.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_lowercase(),
        year.as_deref().unwrap_or(""),
        title_key
    );

    let mut fields = vec![("title", record.title.clone())];
    if !authors.is_empty() {
        let names: Vec<String> = authors.iter().map(|a| inverted_name(a)).collect();
        fields.insert(0, ("author", names.join(" and ")));
    }
    if let Some(journal) = journal(record) {
        fields.push(("journal", journal.to_string()));
    }
    if let Some(year) = year {
        fields.push(("year", year));
    }
    if record.has_doi() {
        fields.push(("doi", record.doi.clone()));
    }
    if !record.url.is_empty() {
        fields.push(("url", record.url.clone()));
    }

    let body: Vec<String> = fields
        .iter()
        .map(|(name, value)| format!("  {} = {{{}}}", name, value))
        .collect();
    format!("@article{{{},\n{}\n}}", key, body.join(",\n"))
}
