//! Paper record model produced by result normalization.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Default title for works without one
pub const UNTITLED: &str = "Untitled";

/// Default author line for works without usable author names
pub const UNKNOWN_AUTHORS: &str = "Unknown authors";

/// Default abstract text
pub const NO_ABSTRACT: &str = "No abstract available.";

/// Default journal name
pub const UNKNOWN_JOURNAL: &str = "Unknown Journal";

/// Sentinel stored in [`PaperRecord::doi`] when the work has no DOI
pub const NO_DOI: &str = "No DOI available";

/// Publication year of a paper, or `N/A` when none could be extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PublicationYear {
    Year(i32),
    #[default]
    Unknown,
}

impl PublicationYear {
    /// Returns the year as a number, if known
    pub fn value(&self) -> Option<i32> {
        match self {
            PublicationYear::Year(year) => Some(*year),
            PublicationYear::Unknown => None,
        }
    }
}

impl From<Option<i32>> for PublicationYear {
    fn from(year: Option<i32>) -> Self {
        year.map_or(PublicationYear::Unknown, PublicationYear::Year)
    }
}

impl fmt::Display for PublicationYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicationYear::Year(year) => write!(f, "{}", year),
            PublicationYear::Unknown => write!(f, "N/A"),
        }
    }
}

// Serialized as a bare number, or the string "N/A"
impl Serialize for PublicationYear {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PublicationYear::Year(year) => serializer.serialize_i32(*year),
            PublicationYear::Unknown => serializer.serialize_str("N/A"),
        }
    }
}

impl<'de> Deserialize<'de> for PublicationYear {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i32),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(year) => PublicationYear::Year(year),
            Raw::Text(text) => text
                .trim()
                .parse()
                .map(PublicationYear::Year)
                .unwrap_or(PublicationYear::Unknown),
        })
    }
}

/// A normalized CrossRef work, ready for rendering.
///
/// Every field has a documented default, so a record can always be displayed
/// no matter how sparse the upstream item was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperRecord {
    /// Identifier, unique within one result set
    pub id: String,

    /// Paper title
    pub title: String,

    /// Authors in display form (comma-separated)
    pub authors: String,

    /// Plain-text abstract
    pub r#abstract: String,

    /// Publication year
    pub year: PublicationYear,

    /// Number of works citing this one
    pub citation_count: u64,

    /// Journal or other container title
    pub journal: String,

    /// Digital Object Identifier, or [`NO_DOI`]
    pub doi: String,

    /// Landing page URL (may be empty)
    pub url: String,

    /// Full-text link (may be empty)
    pub pdf_url: String,

    /// Subject headings
    pub subjects: Vec<String>,
}

impl PaperRecord {
    /// Whether the record carries a real DOI
    pub fn has_doi(&self) -> bool {
        !self.doi.is_empty() && self.doi != NO_DOI
    }

    /// Resolver link for the DOI, if there is one
    pub fn doi_link(&self) -> Option<String> {
        self.has_doi().then(|| doi_url(&self.doi))
    }

    /// Returns the author names as a vector
    pub fn author_list(&self) -> Vec<&str> {
        if self.authors == UNKNOWN_AUTHORS {
            return Vec::new();
        }
        self.authors
            .split([',', ';'])
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Check if the record has any full-text link
    pub fn has_pdf(&self) -> bool {
        !self.pdf_url.is_empty()
    }
}

/// Build the `https://doi.org/` resolver URL for a DOI
pub fn doi_url(doi: &str) -> String {
    format!("https://doi.org/{}", doi)
}
