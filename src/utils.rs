use crate::regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

static DOI_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^10\.\d{4,9}/[-._;()/:A-Z0-9]+$").unwrap());

static DOI_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:https?://(?:dx\.)?doi\.org/|doi:\s*)").unwrap()
});

/// Check whether a string is a syntactically valid DOI.
///
/// # Examples
///
/// ```
/// assert!(bibref::is_valid_doi("10.1000/xyz123"));
/// assert!(!bibref::is_valid_doi("not-a-doi"));
/// ```
pub fn is_valid_doi(doi: &str) -> bool {
    DOI_REGEX.is_match(doi)
}

/// Strips resolver URL and `doi:` prefixes and all whitespace from a DOI.
///
/// Unlike lookups, case is preserved so duplicate detection compares the DOI
/// exactly as the source wrote it. Returns `None` for blank input.
pub fn normalize_doi(doi: &str) -> Option<String> {
    let trimmed = doi.trim();
    let stripped = DOI_PREFIX_REGEX.replace(trimmed, "");
    let cleaned: String = stripped.chars().filter(|c| !c.is_whitespace()).collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Generate a record id: a millisecond timestamp plus a random suffix.
///
/// Collisions are improbable for interactive use but not cryptographically ruled out.
pub fn generate_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("ref_{}_{}", millis, &suffix[..9])
}

/// Compare two strings the way a human-facing sort expects.
///
/// Letters compare case- and accent-insensitively first; accents then case
/// break ties, with lowercase ahead of uppercase.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    base_key(a)
        .cmp(&base_key(b))
        .then_with(|| accent_key(a).cmp(&accent_key(b)))
        .then_with(|| case_key(a).cmp(&case_key(b)))
}

fn base_key(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn accent_key(s: &str) -> String {
    s.nfd().flat_map(char::to_lowercase).collect()
}

fn case_key(s: &str) -> Vec<bool> {
    s.chars().map(char::is_uppercase).collect()
}
