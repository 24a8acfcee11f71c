//! Storage and querying of canonical references.
//!
//! The free functions operate on any slice of references; [`ReferenceRepository`]
//! wraps an owned, ordered collection and adds duplicate-checked insertion,
//! replacement by id and citation numbering.

use crate::style::{InlineStyle, inline_citation};
use crate::utils::locale_cmp;
use crate::{Reference, non_empty};
use std::cmp::Ordering;

/// Whether two records describe the same work.
///
/// Records match on a shared non-empty DOI, a shared non-empty id, or
/// non-empty titles that are equal ignoring case.
pub fn same_work(a: &Reference, b: &Reference) -> bool {
    if let (Some(x), Some(y)) = (a.doi(), b.doi())
        && x == y
    {
        return true;
    }
    if let (Some(x), Some(y)) = (a.title(), b.title())
        && x.to_lowercase() == y.to_lowercase()
    {
        return true;
    }
    !a.id.is_empty() && a.id == b.id
}

/// Whether `candidate` duplicates any record in `existing`.
pub fn is_duplicate(existing: &[Reference], candidate: &Reference) -> bool {
    existing.iter().any(|reference| same_work(reference, candidate))
}

/// Criteria accepted by [`sort_references`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// First author's family name, ascending. Records without one come first.
    Author,
    /// Year, descending. Records without a year count as year 0.
    Year,
    /// Title, ascending. Records without a title sort as the empty string.
    Title,
}

impl SortKey {
    /// Parses `author`, `year` or `title`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "author" => Some(SortKey::Author),
            "year" => Some(SortKey::Year),
            "title" => Some(SortKey::Title),
            _ => None,
        }
    }

    fn compare(&self, a: &Reference, b: &Reference) -> Ordering {
        match self {
            SortKey::Author => locale_cmp(
                a.authors.first().map_or("", |n| n.family.as_str()),
                b.authors.first().map_or("", |n| n.family.as_str()),
            ),
            SortKey::Year => b.year().unwrap_or(0).cmp(&a.year().unwrap_or(0)),
            SortKey::Title => locale_cmp(
                non_empty(&a.title).unwrap_or(""),
                non_empty(&b.title).unwrap_or(""),
            ),
        }
    }
}

/// Sort references in place by `author`, `year` or `title`.
///
/// The sort is stable. An unknown key leaves the order unchanged.
pub fn sort_references(references: &mut [Reference], by: &str) {
    match SortKey::from_key(by) {
        Some(key) => references.sort_by(|a, b| key.compare(a, b)),
        None => tracing::debug!(key = by, "unknown sort key, order unchanged"),
    }
}

/// Text a keyword search looks at: title, authors and year, lowercased.
fn search_haystacks(reference: &Reference) -> [String; 3] {
    let authors = reference
        .authors
        .iter()
        .map(|a| format!("{} {}", a.family, a.given.as_deref().unwrap_or("")))
        .collect::<Vec<_>>()
        .join(" ");
    [
        reference.title.as_deref().unwrap_or("").to_lowercase(),
        authors.to_lowercase(),
        reference.year().map(|y| y.to_string()).unwrap_or_default(),
    ]
}

/// Records whose title, author names or year contain `keyword`, ignoring case.
///
/// An empty keyword matches every record.
pub fn search_references<'a>(references: &'a [Reference], keyword: &str) -> Vec<&'a Reference> {
    let keyword = keyword.to_lowercase();
    references
        .iter()
        .filter(|reference| {
            search_haystacks(reference)
                .iter()
                .any(|haystack| haystack.contains(&keyword))
        })
        .collect()
}

/// An ordered collection of references, unique by the duplicate rule.
///
/// Order is insertion order until [`ReferenceRepository::sort`] is called.
/// Numeric inline citations use the 1-based position in this order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceRepository {
    references: Vec<Reference>,
}

impl ReferenceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reference unless it duplicates one already held.
    ///
    /// Returns `false` when the reference was rejected as a duplicate.
    pub fn add(&mut self, reference: Reference) -> bool {
        if is_duplicate(&self.references, &reference) {
            tracing::debug!(id = %reference.id, "duplicate reference not added");
            return false;
        }
        self.references.push(reference);
        true
    }

    /// Replace the record with the same id, keeping its position.
    ///
    /// Returns the previous record, or `None` (and stores nothing) if no record has that id.
    pub fn replace(&mut self, reference: Reference) -> Option<Reference> {
        let slot = self.references.iter_mut().find(|r| r.id == reference.id)?;
        Some(std::mem::replace(slot, reference))
    }

    /// Remove and return the record with `id`.
    pub fn remove(&mut self, id: &str) -> Option<Reference> {
        let position = self.position(id)?;
        Some(self.references.remove(position))
    }

    pub fn get(&self, id: &str) -> Option<&Reference> {
        self.references.iter().find(|r| r.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reference> {
        self.references.iter()
    }

    pub fn as_slice(&self) -> &[Reference] {
        &self.references
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn contains_duplicate_of(&self, candidate: &Reference) -> bool {
        is_duplicate(&self.references, candidate)
    }

    /// Sort in place; see [`sort_references`].
    pub fn sort(&mut self, by: &str) {
        sort_references(&mut self.references, by);
    }

    /// See [`search_references`].
    pub fn search(&self, keyword: &str) -> Vec<&Reference> {
        search_references(&self.references, keyword)
    }

    /// 1-based position of the record with `id`.
    pub fn citation_number(&self, id: &str) -> Option<usize> {
        self.position(id).map(|p| p + 1)
    }

    /// In-text citation for the record with `id`, numbered by its position.
    pub fn inline_citation(&self, id: &str, style: InlineStyle) -> Option<String> {
        let position = self.position(id)?;
        Some(inline_citation(&self.references[position], style, position + 1))
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.references.iter().position(|r| r.id == id)
    }
}

impl<'a> IntoIterator for &'a ReferenceRepository {
    type Item = &'a Reference;
    type IntoIter = std::slice::Iter<'a, Reference>;

    fn into_iter(self) -> Self::IntoIter {
        self.references.iter()
    }
}

impl Extend<Reference> for ReferenceRepository {
    /// Adds each reference, skipping duplicates.
    fn extend<T: IntoIterator<Item = Reference>>(&mut self, iter: T) {
        for reference in iter {
            self.add(reference);
        }
    }
}
