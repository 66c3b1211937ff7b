//! CrossRef research source implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::normalize::RawWork;
use super::params::{QueryParams, DEFAULT_MAILTO};
use super::{Source, SourceError, WorksPage};
use crate::utils::{polite_user_agent, HttpClient};

pub const CROSSREF_API_BASE: &str = "https://api.crossref.org";

/// CrossRef research source
///
/// Uses the CrossRef REST API `/works` endpoint for search and DOI lookup.
#[derive(Debug, Clone)]
pub struct CrossRefSource {
    client: HttpClient,
    base_url: String,
}

impl CrossRefSource {
    /// Source against the public API with the default contact address
    pub fn new() -> Result<Self, SourceError> {
        Self::with_base_url(CROSSREF_API_BASE, DEFAULT_MAILTO, Duration::from_secs(30))
    }

    /// Source against `base_url`, identifying as `mailto`.
    ///
    /// `timeout` is a transport-level ceiling; search deadlines are enforced by
    /// the session controller.
    pub fn with_base_url(
        base_url: &str,
        mailto: &str,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        url::Url::parse(base_url)
            .map_err(|e| SourceError::Network(format!("Invalid base URL '{}': {}", base_url, e)))?;

        let client = HttpClient::with_user_agent(&polite_user_agent(mailto), timeout)
            .map_err(|e| SourceError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, SourceError> {
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Api {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl Source for CrossRefSource {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "CrossRef"
    }

    async fn search_works(&self, params: &QueryParams) -> Result<WorksPage, SourceError> {
        let url = format!("{}/works", self.base_url);
        tracing::debug!(
            query = %params.query,
            rows = params.rows,
            offset = params.offset,
            filter = ?params.filter,
            sort = ?params.sort,
            "Requesting CrossRef works"
        );

        let data: CRResponse<CRWorksMessage> = self.get_json(&url, &params.to_pairs()).await?;

        let items = data
            .message
            .items
            .into_iter()
            .map(RawWork::from_value)
            .collect();

        Ok(WorksPage::new(items, data.message.total_results))
    }

    async fn work_by_doi(&self, doi: &str) -> Result<RawWork, SourceError> {
        let doi = doi.trim();
        if doi.is_empty() {
            return Err(SourceError::NotFound("empty DOI".to_string()));
        }

        let url = format!("{}/works/{}", self.base_url, doi_path(doi));
        let data: CRResponse<serde_json::Value> = self.get_json(&url, &[]).await.map_err(|e| match e {
            SourceError::Api { status: 404, .. } => SourceError::NotFound(doi.to_string()),
            other => other,
        })?;

        Ok(RawWork::from_value(data.message))
    }
}

/// Percent-encode each `/`-separated part of a DOI for use in a URL path
fn doi_path(doi: &str) -> String {
    doi.split('/')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

// ===== CrossRef API Types =====

#[derive(Debug, Deserialize)]
struct CRResponse<T> {
    message: T,
}

#[derive(Debug, Deserialize)]
struct CRWorksMessage {
    #[serde(rename = "total-results", default)]
    total_results: u64,
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let source =
            CrossRefSource::with_base_url("http://localhost:1234/", "a@b.c", Duration::from_secs(1))
                .unwrap();
        assert_eq!(source.base_url(), "http://localhost:1234");
        assert_eq!(source.id(), "crossref");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result = CrossRefSource::with_base_url("not a url", "a@b.c", Duration::from_secs(1));
        assert!(matches!(result, Err(SourceError::Network(_))));
    }

    #[test]
    fn test_doi_path_encoding() {
        assert_eq!(doi_path("10.1000/ml.1"), "10.1000/ml.1");
        assert_eq!(doi_path("10.1002/x#1"), "10.1002/x%231");
        assert_eq!(doi_path("10.1002/(SICI)1097?a b"), "10.1002/%28SICI%291097%3Fa%20b");
    }

    #[test]
    fn test_works_message_tolerates_missing_fields() {
        let data: CRResponse<CRWorksMessage> =
            serde_json::from_str(r#"{"status":"ok","message":{}}"#).unwrap();
        assert_eq!(data.message.total_results, 0);
        assert!(data.message.items.is_empty());
    }
}
