//! A bibliographic reference engine: ingest, deduplicate, index, and format citations.
//!
//! `bibref` takes reference data from three places and normalizes all of it
//! into one canonical, CSL-JSON shaped [`Reference`]:
//!
//! - remote metadata lookups by identifier (DOI or PubMed ID) through a
//!   [`provider::MetadataProvider`], memoized by a [`cache::ReferenceCache`]
//! - BibTeX text, through the [`bibtex::BibTexCodec`]
//! - manually entered fields, through the [`builder::ReferenceBuilder`]
//!
//! Canonical records are stored and queried in a
//! [`repository::ReferenceRepository`] and rendered into citation text by the
//! [`style::StyleRegistry`], which ships a rule-based GOST formatter and
//! delegates template styles (APA, Vancouver, Harvard, IEEE, MLA) to an
//! externally supplied [`style::CslRenderer`].
//!
//! # Features
//!
//! - `bibtex` - BibTeX import/export (enabled by default)
//! - `regex` - Use the `regex` crate for pattern matching (enabled by default)
//! - `lite` - Use `regex-lite` instead of `regex`
//! - `diagnostics` - Render BibTeX parse errors as ariadne reports
//!
//! # Basic Usage
//!
//! ```rust
//! use bibref::builder::{ManualFields, ReferenceBuilder};
//! use bibref::style::{gost::GostFormatter, Lang, StyleFormatter};
//!
//! let reference = ReferenceBuilder::new().build(ManualFields {
//!     title: Some("Deep Learning".to_string()),
//!     authors: vec!["LeCun, Yann".to_string(), "Geoffrey Hinton".to_string()],
//!     year: Some(2015),
//!     journal: Some("Nature".to_string()),
//!     ..Default::default()
//! });
//!
//! let text = GostFormatter.format(&reference, Lang::En).unwrap();
//! assert_eq!(text, "LeCun Y., Hinton G. Deep Learning // Nature. 2015");
//! ```
//!
//! # Error Handling
//!
//! Import and lookup paths return typed errors ([`ParseError`], [`FetchError`]).
//! Formatting never fails: any [`FormatFault`] is absorbed by a minimal
//! fallback formatter. BibTeX export degrades to an inline marker string
//! instead of returning an error.

use serde::{Deserialize, Serialize};

#[cfg(feature = "bibtex")]
pub mod bibtex;
pub mod builder;
pub mod cache;
pub mod config;
#[cfg(feature = "diagnostics")]
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod provider;
pub mod repository;
pub mod style;

pub mod author;

// Reexports
pub use author::parse_author_name;
#[cfg(feature = "bibtex")]
pub use bibtex::BibTexCodec;
pub use config::EngineConfig;
pub use engine::CitationEngine;
pub use error::{FetchError, FormatFault, ParseError, ProviderError, SourceSpan, ValueError};
pub use utils::{is_valid_doi, normalize_doi};

mod regex;
mod utils;

/// Record type assigned when a conversion path does not provide one.
pub const DEFAULT_RECORD_TYPE: &str = "article-journal";

/// A personal name in citation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
    /// Family (last) name. May be empty for unparseable input.
    #[serde(default)]
    pub family: String,
    /// Given name(s), absent when unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,
}

impl Name {
    /// Create a name from a family name and an optional given name.
    pub fn new(family: impl Into<String>, given: Option<String>) -> Self {
        Self {
            family: family.into(),
            given,
        }
    }

    /// First character of the given name, if there is one.
    pub fn given_initial(&self) -> Option<char> {
        self.given.as_deref().and_then(|g| g.chars().next())
    }
}

/// CSL-style issued date. Only the first date part of the first date is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issued {
    #[serde(rename = "date-parts", default)]
    pub date_parts: Vec<Vec<Option<i32>>>,
}

impl Issued {
    /// An issued date carrying only a year.
    pub fn from_year(year: i32) -> Self {
        Self {
            date_parts: vec![vec![Some(year)]],
        }
    }

    /// The year, when the first date part is present.
    pub fn year(&self) -> Option<i32> {
        self.date_parts
            .first()
            .and_then(|parts| parts.first())
            .copied()
            .flatten()
    }
}

/// The canonical bibliographic record every ingestion path produces.
///
/// Field names follow CSL-JSON when serialized, so records can be exchanged
/// with CSL tooling unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    /// Identifier, unique within a repository.
    #[serde(default)]
    pub id: String,
    /// Record type tag such as `article-journal`.
    #[serde(rename = "type", default = "default_record_type")]
    pub record_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Authors in citation order.
    #[serde(rename = "author", default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Name>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued: Option<Issued>,
    /// Journal or book title the work appeared in.
    #[serde(rename = "container-title", default, skip_serializing_if = "Option::is_none")]
    pub container_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(rename = "page", default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,
    #[serde(rename = "DOI", default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(rename = "URL", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
}

fn default_record_type() -> String {
    DEFAULT_RECORD_TYPE.to_string()
}

impl Default for Reference {
    fn default() -> Self {
        Self {
            id: String::new(),
            record_type: default_record_type(),
            title: None,
            authors: Vec::new(),
            issued: None,
            container_title: None,
            volume: None,
            issue: None,
            pages: None,
            doi: None,
            url: None,
            publisher: None,
        }
    }
}

impl Reference {
    /// Create an empty record with the given id and the default record type.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Publication year, if known.
    pub fn year(&self) -> Option<i32> {
        self.issued.as_ref().and_then(Issued::year)
    }

    /// Family name of the first author when it is present and non-empty.
    pub fn first_author_family(&self) -> Option<&str> {
        self.authors
            .first()
            .map(|a| a.family.as_str())
            .filter(|f| !f.is_empty())
    }

    /// Title when present and non-empty.
    pub fn title(&self) -> Option<&str> {
        non_empty(&self.title)
    }

    /// DOI when present and non-empty.
    pub fn doi(&self) -> Option<&str> {
        non_empty(&self.doi)
    }

    /// Parse CSL-JSON: either a single record object or an array of records.
    pub fn from_csl_json(json: &str) -> serde_json::Result<Vec<Reference>> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            Many(Vec<Reference>),
            One(Box<Reference>),
        }

        Ok(match serde_json::from_str(json)? {
            OneOrMany::Many(references) => references,
            OneOrMany::One(reference) => vec![*reference],
        })
    }

    /// Serialize records as a pretty-printed CSL-JSON array.
    pub fn to_csl_json(references: &[Reference]) -> serde_json::Result<String> {
        serde_json::to_string_pretty(references)
    }
}

/// Borrow an optional string only when it has content.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
