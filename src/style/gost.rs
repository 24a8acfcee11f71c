//! Rule-based GOST bibliography entries.
//!
//! The entry is assembled in a fixed order:
//!
//! ```text
//! <authors> <title> // <container>. <year>. Vol. <v>. No. <n>. P. <pages> DOI: <doi>
//! ```
//!
//! At most three authors are listed (`Family G.`), followed by `et al.` or
//! `и др.` when there are more. Missing title and year render as the Russian
//! placeholders `Без названия` and `б.г.` in every language.

use super::{Lang, StyleFormatter};
use crate::error::FormatFault;
use crate::{Name, Reference, non_empty};
use itertools::Itertools;

const MAX_AUTHORS: usize = 3;
const NO_TITLE: &str = "Без названия";
const NO_YEAR: &str = "б.г.";

/// Language-dependent labels.
struct Labels {
    et_al: &'static str,
    volume: &'static str,
    issue: &'static str,
    pages: &'static str,
}

const RU: Labels = Labels {
    et_al: " и др.",
    volume: "Т.",
    issue: "№",
    pages: "С.",
};

const EN: Labels = Labels {
    et_al: " et al.",
    volume: "Vol.",
    issue: "No.",
    pages: "P.",
};

fn labels(lang: Lang) -> &'static Labels {
    match lang {
        Lang::Ru => &RU,
        Lang::En | Lang::Cn => &EN,
    }
}

/// `Family G.`, or just the family name when there is no given name.
fn author_name(name: &Name) -> String {
    match name.given_initial() {
        Some(initial) => format!("{} {}.", name.family, initial),
        None => name.family.clone(),
    }
}

/// Up to three authors joined by `, `, with the et-al suffix for longer lists.
fn author_clause(authors: &[Name], lang: Lang) -> String {
    let mut clause = authors.iter().take(MAX_AUTHORS).map(author_name).join(", ");
    if authors.len() > MAX_AUTHORS {
        clause.push_str(labels(lang).et_al);
    }
    clause
}

/// Formatter for the `gost-numeric` and `gost-author-date` styles.
#[derive(Debug, Clone, Copy, Default)]
pub struct GostFormatter;

impl GostFormatter {
    /// Render a reference. This never fails.
    pub fn render(&self, reference: &Reference, lang: Lang) -> String {
        let labels = labels(lang);
        let mut citation = String::new();

        let authors = author_clause(&reference.authors, lang);
        if !authors.is_empty() {
            citation.push_str(&authors);
            citation.push(' ');
        }
        citation.push_str(reference.title().unwrap_or(NO_TITLE));

        if let Some(container) = non_empty(&reference.container_title) {
            citation.push_str(" // ");
            citation.push_str(container);
        }

        citation.push_str(". ");
        match reference.year() {
            Some(year) => citation.push_str(&year.to_string()),
            None => citation.push_str(NO_YEAR),
        }

        for (label, value) in [
            (labels.volume, &reference.volume),
            (labels.issue, &reference.issue),
            (labels.pages, &reference.pages),
        ] {
            if let Some(value) = non_empty(value) {
                citation.push_str(&format!(". {} {}", label, value));
            }
        }

        if let Some(doi) = reference.doi() {
            citation.push_str(" DOI: ");
            citation.push_str(doi);
        }

        citation
    }
}

impl StyleFormatter for GostFormatter {
    fn format(&self, reference: &Reference, lang: Lang) -> Result<String, FormatFault> {
        Ok(self.render(reference, lang))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Issued;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn name(family: &str, given: Option<&str>) -> Name {
        Name::new(family, given.map(str::to_string))
    }

    fn full_reference() -> Reference {
        Reference {
            id: "r1".into(),
            title: Some("Deep learning".into()),
            authors: vec![
                name("LeCun", Some("Yann")),
                name("Bengio", Some("Yoshua")),
                name("Hinton", Some("Geoffrey")),
            ],
            issued: Some(Issued::from_year(2015)),
            container_title: Some("Nature".into()),
            volume: Some("521".into()),
            issue: Some("7553".into()),
            pages: Some("436-444".into()),
            doi: Some("10.1038/nature14539".into()),
            ..Reference::default()
        }
    }

    #[test]
    fn test_full_record_english() {
        assert_eq!(
            GostFormatter.render(&full_reference(), Lang::En),
            "LeCun Y., Bengio Y., Hinton G. Deep learning // Nature. 2015. Vol. 521. No. 7553. P. 436-444 DOI: 10.1038/nature14539"
        );
    }

    #[test]
    fn test_full_record_russian() {
        assert_eq!(
            GostFormatter.render(&full_reference(), Lang::Ru),
            "LeCun Y., Bengio Y., Hinton G. Deep learning // Nature. 2015. Т. 521. № 7553. С. 436-444 DOI: 10.1038/nature14539"
        );
    }

    #[rstest]
    #[case(Lang::En, "A B., C D., E F. et al. Title. 2000")]
    #[case(Lang::Ru, "A B., C D., E F. и др. Title. 2000")]
    #[case(Lang::Cn, "A B., C D., E F. et al. Title. 2000")]
    fn test_more_than_three_authors(#[case] lang: Lang, #[case] expected: &str) {
        let reference = Reference {
            title: Some("Title".into()),
            authors: vec![
                name("A", Some("Bob")),
                name("C", Some("Dan")),
                name("E", Some("Fay")),
                name("G", Some("Hal")),
            ],
            issued: Some(Issued::from_year(2000)),
            ..Reference::default()
        };
        assert_eq!(GostFormatter.render(&reference, lang), expected);
    }

    #[test]
    fn test_exactly_three_authors_lists_all() {
        let reference = Reference {
            authors: vec![name("A", None), name("B", None), name("C", None)],
            ..Reference::default()
        };
        assert_eq!(
            GostFormatter.render(&reference, Lang::En),
            "A, B, C Без названия. б.г."
        );
    }

    #[test]
    fn test_empty_record_uses_russian_placeholders() {
        assert_eq!(
            GostFormatter.render(&Reference::default(), Lang::En),
            "Без названия. б.г."
        );
    }

    #[test]
    fn test_missing_given_name_has_no_initial() {
        let reference = Reference {
            title: Some("Война и мир".into()),
            authors: vec![name("Толстой", Some("Лев")), name("Anon", Some(""))],
            issued: Some(Issued::from_year(1869)),
            pages: Some("1-1225".into()),
            ..Reference::default()
        };
        assert_eq!(
            GostFormatter.render(&reference, Lang::Ru),
            "Толстой Л., Anon Война и мир. 1869. С. 1-1225"
        );
    }

    #[test]
    fn test_format_never_fails() {
        assert!(GostFormatter.format(&Reference::default(), Lang::Ru).is_ok());
    }
}
