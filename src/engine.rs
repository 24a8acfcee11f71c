//! The citation engine: the operations exposed to editors and UIs.
//!
//! A [`CitationEngine`] owns its cache, repository and style registry. There
//! is no global state; callers construct an engine and decide its lifetime.
//!
//! # Example
//!
//! ```
//! use bibref::CitationEngine;
//! use bibref::builder::ManualFields;
//! use bibref::style::Lang;
//!
//! let mut engine = CitationEngine::builder().build();
//! let reference = engine.create_manual_reference(ManualFields {
//!     title: Some("Война и мир".to_string()),
//!     authors: vec!["Толстой, Лев".to_string()],
//!     year: Some(1869),
//!     ..Default::default()
//! });
//!
//! assert_eq!(
//!     engine.format_reference(&reference, "gost-numeric", Lang::Ru),
//!     "Толстой Л. Война и мир. 1869"
//! );
//! assert!(engine.repository_mut().add(reference));
//! ```

use crate::builder::{ManualFields, ReferenceBuilder};
use crate::cache::ReferenceCache;
use crate::config::EngineConfig;
use crate::error::{FetchError, IdentifierScheme, ProviderError};
use crate::provider::MetadataProvider;
use crate::repository::{self, ReferenceRepository};
use crate::style::{CslRenderer, InlineStyle, Lang, StyleFormatter, StyleRegistry, inline_citation};
use crate::{Reference, utils};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(feature = "bibtex")]
use crate::bibtex::BibTexCodec;
#[cfg(feature = "bibtex")]
use crate::error::ParseError;

/// Stands in for a provider the engine was built without.
struct Unconfigured(IdentifierScheme);

#[async_trait]
impl MetadataProvider for Unconfigured {
    async fn resolve(&self, identifier: &str) -> Result<Reference, ProviderError> {
        Err(ProviderError::transport(
            identifier,
            format!("no {} provider configured", self.0),
        ))
    }
}

/// Assembles a [`CitationEngine`].
///
/// Providers and the CSL renderer are optional. Without a provider, lookups
/// of that kind fail with a [`FetchError`]. Without a renderer, only the GOST
/// styles render fully and every other style uses the minimal fallback.
#[derive(Default)]
pub struct CitationEngineBuilder {
    config: EngineConfig,
    doi_provider: Option<Box<dyn MetadataProvider>>,
    pubmed_provider: Option<Box<dyn MetadataProvider>>,
    renderer: Option<Arc<dyn CslRenderer>>,
    extra_styles: Vec<(String, Arc<dyn StyleFormatter>)>,
}

impl CitationEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Provider used by [`CitationEngine::fetch_by_doi`].
    pub fn doi_provider(mut self, provider: impl MetadataProvider + 'static) -> Self {
        self.doi_provider = Some(Box::new(provider));
        self
    }

    /// Provider used by [`CitationEngine::fetch_by_pubmed_id`].
    pub fn pubmed_provider(mut self, provider: impl MetadataProvider + 'static) -> Self {
        self.pubmed_provider = Some(Box::new(provider));
        self
    }

    /// External CSL processor for template styles.
    pub fn renderer(mut self, renderer: impl CslRenderer + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    /// Registers an additional style, or overrides a built-in one.
    pub fn style(mut self, id: &str, formatter: impl StyleFormatter + 'static) -> Self {
        self.extra_styles.push((id.to_string(), Arc::new(formatter)));
        self
    }

    pub fn build(self) -> CitationEngine {
        let mut styles = StyleRegistry::builtin(self.renderer, &self.config);
        for (id, formatter) in self.extra_styles {
            styles.register_shared(&id, formatter);
        }

        CitationEngine {
            doi_provider: self
                .doi_provider
                .unwrap_or_else(|| Box::new(Unconfigured(IdentifierScheme::Doi))),
            pubmed_provider: self
                .pubmed_provider
                .unwrap_or_else(|| Box::new(Unconfigured(IdentifierScheme::PubMed))),
            config: self.config,
            cache: ReferenceCache::new(),
            repository: ReferenceRepository::new(),
            styles,
            builder: ReferenceBuilder::new(),
            #[cfg(feature = "bibtex")]
            codec: BibTexCodec::new(),
        }
    }
}

/// Ingests, stores and formats references.
pub struct CitationEngine {
    config: EngineConfig,
    cache: ReferenceCache,
    repository: ReferenceRepository,
    styles: StyleRegistry,
    doi_provider: Box<dyn MetadataProvider>,
    pubmed_provider: Box<dyn MetadataProvider>,
    builder: ReferenceBuilder,
    #[cfg(feature = "bibtex")]
    codec: BibTexCodec,
}

impl std::fmt::Debug for CitationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CitationEngine")
            .field("config", &self.config)
            .field("cached", &self.cache.len())
            .field("references", &self.repository.len())
            .field("styles", &self.styles)
            .finish_non_exhaustive()
    }
}

impl Default for CitationEngine {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CitationEngine {
    pub fn builder() -> CitationEngineBuilder {
        CitationEngineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn repository(&self) -> &ReferenceRepository {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut ReferenceRepository {
        &mut self.repository
    }

    pub fn cache(&self) -> &ReferenceCache {
        &self.cache
    }

    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    /// Look up a DOI, answering from the cache when possible.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` when the provider fails. Failures are not cached.
    pub async fn fetch_by_doi(&mut self, doi: &str) -> Result<Reference, FetchError> {
        self.cache
            .fetch_by_doi(self.doi_provider.as_ref(), doi)
            .await
    }

    /// Look up a PubMed ID, answering from the cache when possible.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` when the provider fails. Failures are not cached.
    pub async fn fetch_by_pubmed_id(&mut self, pmid: &str) -> Result<Reference, FetchError> {
        self.cache
            .fetch_by_pubmed_id(self.pubmed_provider.as_ref(), pmid)
            .await
    }

    /// Parse BibTeX text into references.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the text is not well-formed BibTeX.
    #[cfg(feature = "bibtex")]
    pub fn import_bibtex(&self, text: &str) -> Result<Vec<Reference>, ParseError> {
        self.codec.import(text)
    }

    /// Serialize references as BibTeX.
    ///
    /// Does not return an error: on failure the result is the
    /// `% Error exporting to BibTeX` marker, so inspect the text.
    #[cfg(feature = "bibtex")]
    pub fn export_to_bibtex(&self, references: &[Reference]) -> String {
        self.codec.export(references)
    }

    /// Format one reference. Never fails.
    ///
    /// Unknown styles are formatted with the fallback style; any formatting
    /// failure yields `"<Family> (<Year>). <Title>"`.
    pub fn format_reference(&self, reference: &Reference, style: &str, lang: Lang) -> String {
        self.styles.format(reference, style, lang)
    }

    /// Format with the configured default style and language.
    pub fn format_reference_default(&self, reference: &Reference) -> String {
        self.format_reference(
            reference,
            self.config.default_style(),
            Lang::from_tag(self.config.default_lang()),
        )
    }

    /// Format many references in order.
    pub fn format_references(&self, references: &[Reference], style: &str, lang: Lang) -> Vec<String> {
        references
            .iter()
            .map(|reference| self.format_reference(reference, style, lang))
            .collect()
    }

    /// Format one reference in several languages, keyed by language tag.
    pub fn format_multilingual(
        &self,
        reference: &Reference,
        style: &str,
        langs: &[Lang],
    ) -> BTreeMap<String, String> {
        langs
            .iter()
            .map(|lang| (lang.tag().to_string(), self.format_reference(reference, style, *lang)))
            .collect()
    }

    /// Build a reference from manually entered fields.
    pub fn create_manual_reference(&self, fields: ManualFields) -> Reference {
        self.builder.build(fields)
    }

    /// See [`crate::is_valid_doi`].
    pub fn is_valid_doi(doi: &str) -> bool {
        utils::is_valid_doi(doi)
    }

    /// See [`crate::repository::is_duplicate`].
    pub fn is_duplicate(existing: &[Reference], candidate: &Reference) -> bool {
        repository::is_duplicate(existing, candidate)
    }

    /// A sorted copy of `references`; see [`crate::repository::sort_references`].
    pub fn sort_references(references: &[Reference], by: &str) -> Vec<Reference> {
        let mut sorted = references.to_vec();
        repository::sort_references(&mut sorted, by);
        sorted
    }

    /// In-text marker: `[index]` for the `numeric` style, `(Family, Year)` otherwise.
    pub fn get_inline_citation(reference: &Reference, style: &str, index: usize) -> String {
        inline_citation(reference, InlineStyle::from_tag(style), index)
    }

    /// See [`crate::repository::search_references`].
    pub fn search_references<'a>(references: &'a [Reference], keyword: &str) -> Vec<&'a Reference> {
        repository::search_references(references, keyword)
    }

    /// Forget every cached lookup. The repository is untouched.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
