//! Mapping of sparse CrossRef work items into [`PaperRecord`]s.
//!
//! CrossRef metadata is deposited by thousands of publishers and almost every
//! field is optional. The normalizer never fails: each field falls back to a
//! documented default.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::models::{
    doi_url, PaperRecord, PublicationYear, NO_ABSTRACT, NO_DOI, UNKNOWN_AUTHORS,
    UNKNOWN_JOURNAL, UNTITLED,
};

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// One item of `message.items` as returned by the `/works` endpoint
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawWork {
    #[serde(rename = "DOI")]
    pub doi: Option<String>,
    pub title: Option<Vec<String>>,
    pub author: Option<Vec<RawAuthor>>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(rename = "published-print")]
    pub published_print: Option<RawDate>,
    #[serde(rename = "published-online")]
    pub published_online: Option<RawDate>,
    #[serde(rename = "is-referenced-by-count")]
    pub is_referenced_by_count: Option<u64>,
    #[serde(rename = "container-title")]
    pub container_title: Option<Vec<String>>,
    #[serde(rename = "URL")]
    pub url: Option<String>,
    pub link: Option<Vec<RawLink>>,
    pub subject: Option<Vec<String>>,
}

impl RawWork {
    /// Decode an item, treating a shape mismatch as an empty work
    pub fn from_value(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::warn!("Malformed CrossRef item, using defaults: {}", e);
            RawWork::default()
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawAuthor {
    pub given: Option<String>,
    pub family: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawDate {
    #[serde(rename = "date-parts")]
    pub date_parts: Option<Vec<Vec<Option<i32>>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawLink {
    #[serde(rename = "URL")]
    pub url: Option<String>,
    #[serde(rename = "content-type")]
    pub content_type: Option<String>,
}

/// Normalize one work.
///
/// `position` is the zero-based index of the item within the whole result
/// set (page offset plus index on the page); it makes ids unique per page.
pub fn normalize_work(work: &RawWork, position: u64) -> PaperRecord {
    let doi = work
        .doi
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let title = first_non_blank(work.title.as_deref()).unwrap_or(UNTITLED).to_string();
    let authors = author_line(work.author.as_deref());

    let r#abstract = work
        .abstract_text
        .as_deref()
        .map(strip_markup)
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| NO_ABSTRACT.to_string());

    let year: PublicationYear = date_year(work.published_print.as_ref())
        .or_else(|| date_year(work.published_online.as_ref()))
        .into();

    let journal = first_non_blank(work.container_title.as_deref())
        .unwrap_or(UNKNOWN_JOURNAL)
        .to_string();

    let url = non_blank(work.url.as_deref())
        .map(str::to_string)
        .or_else(|| doi.map(doi_url))
        .unwrap_or_default();

    let pdf_url = pdf_link(work.link.as_deref())
        .or_else(|| doi.map(doi_url))
        .unwrap_or_default();

    let id = record_id(doi, &title, &authors, position);

    PaperRecord {
        id,
        title,
        authors,
        r#abstract,
        year,
        citation_count: work.is_referenced_by_count.unwrap_or(0),
        journal,
        doi: doi.unwrap_or(NO_DOI).to_string(),
        url,
        pdf_url,
        subjects: work.subject.clone().unwrap_or_default(),
    }
}

/// Normalize a page of works starting at `offset`
pub fn normalize_page(works: &[RawWork], offset: u64) -> Vec<PaperRecord> {
    works
        .iter()
        .enumerate()
        .map(|(index, work)| normalize_work(work, offset + index as u64))
        .collect()
}

/// Remove every `<...>` tag and collapse the remaining whitespace
pub fn strip_markup(text: &str) -> String {
    let plain = MARKUP_TAG.replace_all(text, "");
    WHITESPACE.replace_all(plain.trim(), " ").into_owned()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn first_non_blank(values: Option<&[String]>) -> Option<&str> {
    values?.iter().map(|v| v.trim()).find(|v| !v.is_empty())
}

fn author_line(authors: Option<&[RawAuthor]>) -> String {
    let names: Vec<String> = authors
        .unwrap_or_default()
        .iter()
        .filter_map(|author| {
            let full_name = [author.given.as_deref(), author.family.as_deref()]
                .into_iter()
                .filter_map(non_blank)
                .collect::<Vec<_>>()
                .join(" ");
            if full_name.is_empty() {
                non_blank(author.name.as_deref()).map(str::to_string)
            } else {
                Some(full_name)
            }
        })
        .collect();

    if names.is_empty() {
        UNKNOWN_AUTHORS.to_string()
    } else {
        names.join(", ")
    }
}

/// First component of the first date-parts entry
fn date_year(date: Option<&RawDate>) -> Option<i32> {
    date?.date_parts.as_ref()?.first()?.first().copied().flatten()
}

fn pdf_link(links: Option<&[RawLink]>) -> Option<String> {
    let links = links?;
    links
        .iter()
        .find(|l| {
            l.content_type
                .as_deref()
                .is_some_and(|ct| ct.eq_ignore_ascii_case("application/pdf"))
        })
        .or_else(|| links.first())
        .and_then(|l| non_blank(l.url.as_deref()))
        .map(str::to_string)
}

fn record_id(doi: Option<&str>, title: &str, authors: &str, position: u64) -> String {
    let key = match doi {
        Some(doi) => doi.to_string(),
        None => {
            let digest = md5::compute(format!("{}|{}|{}", title, authors, position).as_bytes());
            format!("{:x}", digest)[..12].to_string()
        }
    };
    format!("paper-{}-{}", position + 1, key)
}
