//! Memoization of provider lookups.
//!
//! The cache is owned by its caller and unsynchronized. Two overlapping lookups
//! of the same uncached identifier may both reach the provider; the last write
//! wins, and both results are equivalent.

use crate::Reference;
use crate::error::{FetchError, IdentifierScheme};
use crate::provider::MetadataProvider;
use std::collections::HashMap;
use std::fmt;

/// A lookup key, namespaced by identifier scheme.
///
/// The scheme is part of the key, so a PMID never collides with a DOI that
/// happens to share its text. `Display` renders DOIs literally and PubMed IDs
/// as `pmid:<id>` for logging.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Doi(String),
    PubMed(String),
}

impl CacheKey {
    /// Key for an identifier of the given scheme.
    pub fn new(scheme: IdentifierScheme, identifier: &str) -> Self {
        match scheme {
            IdentifierScheme::Doi => CacheKey::Doi(identifier.to_string()),
            IdentifierScheme::PubMed => CacheKey::PubMed(identifier.to_string()),
        }
    }

    pub fn scheme(&self) -> IdentifierScheme {
        match self {
            CacheKey::Doi(_) => IdentifierScheme::Doi,
            CacheKey::PubMed(_) => IdentifierScheme::PubMed,
        }
    }

    /// The identifier as it was requested, without namespace.
    pub fn identifier(&self) -> &str {
        match self {
            CacheKey::Doi(id) | CacheKey::PubMed(id) => id,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Doi(doi) => f.write_str(doi),
            CacheKey::PubMed(pmid) => write!(f, "pmid:{}", pmid),
        }
    }
}

/// Resolved records keyed by namespaced identifier.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCache {
    entries: HashMap<CacheKey, Reference>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&Reference> {
        self.entries.get(key)
    }

    pub fn put(&mut self, key: &CacheKey, reference: Reference) {
        self.entries.insert(key.clone(), reference);
    }

    /// Drops every cached record.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a DOI, consulting the cache first.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` when the provider fails. Failures are not cached.
    pub async fn fetch_by_doi(
        &mut self,
        provider: &dyn MetadataProvider,
        doi: &str,
    ) -> Result<Reference, FetchError> {
        self.fetch(provider, CacheKey::Doi(doi.to_string())).await
    }

    /// Resolve a PubMed ID, consulting the cache first.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` when the provider fails. Failures are not cached.
    pub async fn fetch_by_pubmed_id(
        &mut self,
        provider: &dyn MetadataProvider,
        pmid: &str,
    ) -> Result<Reference, FetchError> {
        self.fetch(provider, CacheKey::PubMed(pmid.to_string())).await
    }

    async fn fetch(
        &mut self,
        provider: &dyn MetadataProvider,
        key: CacheKey,
    ) -> Result<Reference, FetchError> {
        if let Some(hit) = self.get(&key) {
            tracing::debug!(key = %key, "reference cache hit");
            return Ok(hit.clone());
        }

        tracing::debug!(key = %key, "reference cache miss");
        match provider.resolve(key.identifier()).await {
            Ok(reference) => {
                self.put(&key, reference.clone());
                Ok(reference)
            }
            Err(source) => {
                let error = FetchError {
                    scheme: key.scheme(),
                    identifier: key.identifier().to_string(),
                    source,
                };
                tracing::error!(error = %error, "metadata lookup failed");
                Err(error)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::CountingProvider;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cache_key_namespacing() {
        assert_eq!(CacheKey::Doi("123".into()).to_string(), "123");
        assert_eq!(CacheKey::PubMed("123".into()).to_string(), "pmid:123");
        assert_eq!(
            CacheKey::new(IdentifierScheme::PubMed, "9").identifier(),
            "9"
        );
    }

    #[tokio::test]
    async fn test_second_lookup_is_served_from_cache() {
        let provider = CountingProvider::default();
        let mut cache = ReferenceCache::new();

        let first = cache.fetch_by_doi(&provider, "10.1/x").await.unwrap();
        let second = cache.fetch_by_doi(&provider, "10.1/x").await.unwrap();
        let third = cache.fetch_by_doi(&provider, "10.1/x").await.unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let provider = CountingProvider::failing();
        let mut cache = ReferenceCache::new();

        let err = cache.fetch_by_doi(&provider, "10.1/x").await.unwrap_err();
        assert_eq!(err.identifier, "10.1/x");
        assert_eq!(err.scheme, IdentifierScheme::Doi);
        assert!(err.to_string().contains("service unavailable"));

        assert!(cache.fetch_by_doi(&provider, "10.1/x").await.is_err());
        assert_eq!(provider.calls(), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_doi_and_pmid_do_not_collide() {
        let provider = CountingProvider::default();
        let mut cache = ReferenceCache::new();

        cache.fetch_by_doi(&provider, "12345").await.unwrap();
        let pubmed = cache.fetch_by_pubmed_id(&provider, "12345").await.unwrap();

        assert_eq!(provider.calls(), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(pubmed.id, "12345");
        assert!(cache.get(&CacheKey::PubMed("12345".into())).is_some());
    }

    #[tokio::test]
    async fn test_doi_text_matching_pmid_display_is_separate() {
        let doi_provider = CountingProvider::default();
        let pubmed_provider = CountingProvider::default();
        let mut cache = ReferenceCache::new();

        let pubmed = cache.fetch_by_pubmed_id(&pubmed_provider, "1").await.unwrap();
        let doi = cache.fetch_by_doi(&doi_provider, "pmid:1").await.unwrap();

        assert_eq!(pubmed_provider.calls(), 1);
        assert_eq!(doi_provider.calls(), 1);
        assert_eq!(pubmed.id, "1");
        assert_eq!(doi.id, "pmid:1");
        assert_eq!(cache.len(), 2);
        assert_eq!(
            cache.get(&CacheKey::Doi("pmid:1".into())).map(|r| r.id.as_str()),
            Some("pmid:1")
        );
        assert_eq!(
            cache.get(&CacheKey::PubMed("1".into())).map(|r| r.id.as_str()),
            Some("1")
        );
    }

    #[tokio::test]
    async fn test_clear_forces_refetch() {
        let provider = CountingProvider::default();
        let mut cache = ReferenceCache::new();

        cache.fetch_by_pubmed_id(&provider, "1").await.unwrap();
        cache.clear();
        assert!(cache.is_empty());
        cache.fetch_by_pubmed_id(&provider, "1").await.unwrap();

        assert_eq!(provider.calls(), 2);
        assert_eq!(
            provider.seen.lock().unwrap().as_slice(),
            ["1".to_string(), "1".to_string()]
        );
    }
}
