//! Metadata provider contract and the registry-backed providers.
//!
//! A [`MetadataProvider`] resolves one identifier to one canonical record. The
//! bundled providers ([`CrossrefProvider`], [`PubMedProvider`]) only build
//! request URLs and map response JSON; the HTTP transport is supplied by the
//! caller through [`Fetch`], which is also where timeouts and authentication
//! live.

mod crossref;
mod pubmed;

pub use crossref::CrossrefProvider;
pub use pubmed::PubMedProvider;

use crate::Reference;
use crate::error::{ProviderError, ProviderErrorKind};
use async_trait::async_trait;

/// Resolves an identifier (DOI, PMID) to a canonical record.
///
/// Implementations must not cache; caching is layered on top by
/// [`crate::cache::ReferenceCache`].
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Look up a single identifier.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` carrying the identifier when the lookup fails.
    async fn resolve(&self, identifier: &str) -> Result<Reference, ProviderError>;
}

/// HTTP GET transport used by the registry providers.
///
/// Implementations map a missing resource (HTTP 404) to
/// [`ProviderErrorKind::NotFound`] and any other failure to
/// [`ProviderErrorKind::Transport`].
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch the body at `url` as text.
    async fn get(&self, url: &str) -> Result<String, ProviderErrorKind>;
}

#[async_trait]
impl<F: Fetch + ?Sized> Fetch for std::sync::Arc<F> {
    async fn get(&self, url: &str) -> Result<String, ProviderErrorKind> {
        (**self).get(url).await
    }
}

/// Fetch and map a body, attaching the identifier to any failure.
async fn fetch_with<F, T>(
    fetch: &F,
    identifier: &str,
    url: &str,
    map: impl FnOnce(&str) -> Result<T, ProviderErrorKind>,
) -> Result<T, ProviderError>
where
    F: Fetch + ?Sized,
{
    tracing::debug!(identifier, url, "querying metadata registry");
    let body = fetch
        .get(url)
        .await
        .map_err(|kind| ProviderError::new(identifier, kind))?;
    map(&body).map_err(|kind| ProviderError::new(identifier, kind))
}
