//! PubMed ID resolution through the NCBI E-utilities `esummary` endpoint.

use super::{Fetch, MetadataProvider, fetch_with};
use crate::error::{ProviderError, ProviderErrorKind};
use crate::{Issued, Name, Reference};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Prefix of record ids produced by this provider.
pub(crate) const PMID_PREFIX: &str = "pmid:";

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    result: Option<SummaryResult>,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    #[serde(default)]
    uids: Vec<String>,
    #[serde(flatten)]
    documents: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DocumentSummary {
    uid: String,
    error: Option<String>,
    title: Option<String>,
    authors: Vec<SummaryAuthor>,
    source: Option<String>,
    fulljournalname: Option<String>,
    pubdate: Option<String>,
    volume: Option<String>,
    issue: Option<String>,
    pages: Option<String>,
    articleids: Vec<ArticleId>,
}

#[derive(Debug, Deserialize)]
struct SummaryAuthor {
    name: String,
    #[serde(default)]
    authtype: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleId {
    idtype: String,
    value: String,
}

/// Resolves PubMed IDs through E-utilities `esummary`.
pub struct PubMedProvider<F> {
    fetch: F,
    base_url: String,
}

impl<F: Fetch> PubMedProvider<F> {
    /// Creates a provider against the public NCBI endpoint.
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// URL of the JSON document summary for a PMID.
    pub fn summary_url(&self, pmid: &str) -> String {
        format!(
            "{}/esummary.fcgi?db=pubmed&retmode=json&id={}",
            self.base_url,
            urlencoding::encode(pmid.trim())
        )
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Splits a MEDLINE display name (`"LeCun Y"`) into family name and initials.
fn medline_name(name: &str) -> Name {
    match name.trim().rsplit_once(' ') {
        Some((family, initials)) if initials.chars().all(char::is_uppercase) => {
            Name::new(family, Some(initials.to_string()))
        }
        _ => Name::new(name.trim(), None),
    }
}

/// Map an `esummary` JSON body to the record for `pmid`.
pub(crate) fn parse_summary_response(json: &str, pmid: &str) -> Result<Reference, ProviderErrorKind> {
    let response: SummaryResponse = serde_json::from_str(json)
        .map_err(|e| ProviderErrorKind::Malformed(format!("invalid esummary JSON: {}", e)))?;
    let Some(mut result) = response.result else {
        return Err(ProviderErrorKind::NotFound);
    };

    let pmid = pmid.trim();
    let uid = result
        .uids
        .iter()
        .find(|uid| uid.as_str() == pmid)
        .cloned()
        .ok_or(ProviderErrorKind::NotFound)?;
    let document = result
        .documents
        .remove(&uid)
        .ok_or(ProviderErrorKind::NotFound)?;
    let summary: DocumentSummary = serde_json::from_value(document)
        .map_err(|e| ProviderErrorKind::Malformed(format!("invalid document summary: {}", e)))?;

    if let Some(error) = summary.error {
        tracing::debug!(uid = %uid, error = %error, "esummary reported an error for document");
        return Err(ProviderErrorKind::NotFound);
    }

    let authors = summary
        .authors
        .iter()
        .filter(|a| a.authtype.as_deref().is_none_or(|t| t == "Author"))
        .map(|a| medline_name(&a.name))
        .collect();

    let year = summary
        .pubdate
        .as_deref()
        .and_then(|date| date.split_whitespace().next())
        .and_then(|year| year.parse::<i32>().ok());

    let doi = summary
        .articleids
        .into_iter()
        .find(|id| id.idtype == "doi")
        .map(|id| id.value);

    let uid = if summary.uid.is_empty() { uid } else { summary.uid };

    Ok(Reference {
        id: format!("{}{}", PMID_PREFIX, uid),
        record_type: crate::DEFAULT_RECORD_TYPE.to_string(),
        title: non_blank(summary.title).map(|t| t.trim_end_matches('.').to_string()),
        authors,
        issued: year.map(Issued::from_year),
        container_title: non_blank(summary.fulljournalname).or(non_blank(summary.source)),
        volume: non_blank(summary.volume),
        issue: non_blank(summary.issue),
        pages: non_blank(summary.pages),
        doi: non_blank(doi),
        url: Some(format!("https://pubmed.ncbi.nlm.nih.gov/{}/", uid)),
        publisher: None,
    })
}

#[async_trait]
impl<F: Fetch> MetadataProvider for PubMedProvider<F> {
    async fn resolve(&self, identifier: &str) -> Result<Reference, ProviderError> {
        let url = self.summary_url(identifier);
        fetch_with(&self.fetch, identifier, &url, |body| {
            parse_summary_response(body, identifier)
        })
        .await
    }
}
