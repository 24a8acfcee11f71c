//! DOI resolution through the Crossref REST API.
//!
//! API docs: https://api.crossref.org/swagger-ui/index.html

use super::{Fetch, MetadataProvider, fetch_with};
use crate::error::{ProviderError, ProviderErrorKind};
use crate::{Issued, Name, Reference};
use async_trait::async_trait;
use itertools::Itertools;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://api.crossref.org";

#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    message: CrossrefWork,
}

#[derive(Debug, Deserialize)]
struct CrossrefWork {
    #[serde(rename = "DOI")]
    doi: String,
    #[serde(rename = "type")]
    work_type: Option<String>,
    title: Option<Vec<String>>,
    author: Option<Vec<CrossrefAuthor>>,
    #[serde(rename = "container-title")]
    container_title: Option<Vec<String>>,
    issued: Option<CrossrefDate>,
    #[serde(rename = "published-print")]
    published_print: Option<CrossrefDate>,
    #[serde(rename = "published-online")]
    published_online: Option<CrossrefDate>,
    volume: Option<String>,
    issue: Option<String>,
    page: Option<String>,
    publisher: Option<String>,
    #[serde(rename = "URL")]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossrefAuthor {
    given: Option<String>,
    family: Option<String>,
    /// Organizational authors carry a single name.
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossrefDate {
    #[serde(rename = "date-parts")]
    date_parts: Option<Vec<Vec<Option<i32>>>>,
}

impl CrossrefDate {
    fn year(&self) -> Option<i32> {
        self.date_parts
            .as_ref()
            .and_then(|parts| parts.first())
            .and_then(|first| first.first())
            .copied()
            .flatten()
    }
}

/// Crossref's work types, mapped to CSL types where they differ.
fn csl_type(work_type: &str) -> &str {
    match work_type {
        "journal-article" => "article-journal",
        "proceedings-article" => "paper-conference",
        "book-chapter" => "chapter",
        "posted-content" => "article",
        "monograph" | "edited-book" | "reference-book" => "book",
        other => other,
    }
}

/// Resolves DOIs through the Crossref `works` endpoint.
pub struct CrossrefProvider<F> {
    fetch: F,
    base_url: String,
}

impl<F: Fetch> CrossrefProvider<F> {
    /// Creates a provider against the public Crossref API.
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Points the provider at a different API root (mirror or test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// URL of the work record for a DOI.
    ///
    /// Each `/`-separated segment of the DOI is percent-encoded, so `#`, `?`
    /// and `<>` stay part of the path.
    pub fn work_url(&self, doi: &str) -> String {
        let path = doi
            .trim()
            .split('/')
            .map(urlencoding::encode)
            .join("/");
        format!("{}/works/{}", self.base_url, path)
    }
}

/// Map a Crossref `works/<doi>` response body to a canonical record.
pub(crate) fn parse_work_response(json: &str) -> Result<Reference, ProviderErrorKind> {
    let response: CrossrefResponse = serde_json::from_str(json)
        .map_err(|e| ProviderErrorKind::Malformed(format!("invalid Crossref JSON: {}", e)))?;
    let work = response.message;

    let authors = work
        .author
        .unwrap_or_default()
        .into_iter()
        .filter_map(|author| match (author.family, author.name) {
            (Some(family), _) => Some(Name::new(family, author.given.filter(|g| !g.is_empty()))),
            (None, Some(name)) => Some(Name::new(name, None)),
            (None, None) => None,
        })
        .collect();

    let year = [&work.issued, &work.published_print, &work.published_online]
        .into_iter()
        .flatten()
        .find_map(CrossrefDate::year);

    Ok(Reference {
        id: work.doi.clone(),
        record_type: work
            .work_type
            .as_deref()
            .map_or(crate::DEFAULT_RECORD_TYPE, csl_type)
            .to_string(),
        title: work.title.and_then(|t| t.into_iter().next()),
        authors,
        issued: year.map(Issued::from_year),
        container_title: work.container_title.and_then(|t| t.into_iter().next()),
        volume: work.volume,
        issue: work.issue,
        pages: work.page,
        doi: Some(work.doi),
        url: work.url,
        publisher: work.publisher,
    })
}

#[async_trait]
impl<F: Fetch> MetadataProvider for CrossrefProvider<F> {
    async fn resolve(&self, identifier: &str) -> Result<Reference, ProviderError> {
        let url = self.work_url(identifier);
        fetch_with(&self.fetch, identifier, &url, parse_work_response).await
    }
}
