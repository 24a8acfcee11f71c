//! Manual reference entry.

use crate::author::parse_author_name;
use crate::utils::{generate_id, normalize_doi};
use crate::{DEFAULT_RECORD_TYPE, Issued, Reference};

/// Fields of a manually entered reference.
///
/// Authors are free text, one name per entry, in either `"Family, Given"` or
/// `"Given Family"` form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualFields {
    pub id: Option<String>,
    pub record_type: Option<String>,
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub publisher: Option<String>,
}

/// Assembles canonical references from [`ManualFields`].
#[derive(Debug, Clone, Default)]
pub struct ReferenceBuilder;

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ReferenceBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build a reference.
    ///
    /// A missing id is generated and a missing record type defaults to
    /// `article-journal`. Blank author entries are skipped.
    pub fn build(&self, fields: ManualFields) -> Reference {
        let authors = fields
            .authors
            .iter()
            .filter(|name| !name.trim().is_empty())
            .map(|name| parse_author_name(name))
            .collect();

        Reference {
            id: trimmed(fields.id).unwrap_or_else(generate_id),
            record_type: trimmed(fields.record_type)
                .unwrap_or_else(|| DEFAULT_RECORD_TYPE.to_string()),
            title: trimmed(fields.title),
            authors,
            issued: fields.year.map(Issued::from_year),
            container_title: trimmed(fields.journal),
            volume: trimmed(fields.volume),
            issue: trimmed(fields.issue),
            pages: trimmed(fields.pages),
            doi: fields.doi.as_deref().and_then(normalize_doi),
            url: trimmed(fields.url),
            publisher: trimmed(fields.publisher),
        }
    }
}
