//! Minimal formatter used when every other formatting path has failed.

use crate::Reference;

pub(crate) const ANONYMOUS: &str = "Anonymous";
pub(crate) const NO_DATE: &str = "n.d.";
pub(crate) const UNTITLED: &str = "Untitled";

/// Year as text, or `n.d.` when absent.
pub(crate) fn year_or_nd(reference: &Reference) -> String {
    reference
        .year()
        .map_or_else(|| NO_DATE.to_string(), |year| year.to_string())
}

/// Renders `"<Family> (<Year>). <Title>"` with placeholders for missing fields.
///
/// This function cannot fail and always returns non-empty text.
pub fn format_minimal(reference: &Reference) -> String {
    format!(
        "{} ({}). {}",
        reference.first_author_family().unwrap_or(ANONYMOUS),
        year_or_nd(reference),
        reference.title().unwrap_or(UNTITLED)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Issued, Name};

    #[test]
    fn test_format_minimal_complete() {
        let mut reference = Reference::new("a");
        reference.authors = vec![Name::new("Smith", Some("John".into()))];
        reference.issued = Some(Issued::from_year(2020));
        reference.title = Some("On Things".into());
        assert_eq!(format_minimal(&reference), "Smith (2020). On Things");
    }

    #[test]
    fn test_format_minimal_empty_record() {
        assert_eq!(
            format_minimal(&Reference::default()),
            "Anonymous (n.d.). Untitled"
        );
    }

    #[test]
    fn test_format_minimal_blank_fields() {
        let mut reference = Reference::new("a");
        reference.authors = vec![Name::new("", Some("Jane".into()))];
        reference.title = Some(String::new());
        reference.issued = Some(Issued::default());
        assert_eq!(format_minimal(&reference), "Anonymous (n.d.). Untitled");
    }
}
