//! BibTeX data structures and conversion to and from canonical records.
//!
//! # Design Decision
//!
//! ## Field Processing Strategy
//! - **Lenient values**: an unparseable year or an unknown entry type never
//!   fails an import; the field is dropped or mapped to a default
//! - **First-wins**: container title prefers `journal`, then `journaltitle`,
//!   then `booktitle`; the year prefers `year`, then a biblatex `date`
//! - **Strict syntax**: structural problems are reported by the parser, not here

use crate::author::parse_author_name;
use crate::bibtex::latex::{collapse_whitespace, decode_latex, escape_latex};
use crate::error::{ExportError, fields};
use crate::{Issued, Name, Reference, non_empty, utils};
use itertools::Itertools;

/// BibTeX entry types and the CSL record types they map to, in preference order.
const TYPE_MAP: &[(&str, &str)] = &[
    ("article", "article-journal"),
    ("book", "book"),
    ("inproceedings", "paper-conference"),
    ("conference", "paper-conference"),
    ("incollection", "chapter"),
    ("inbook", "chapter"),
    ("phdthesis", "thesis"),
    ("mastersthesis", "thesis"),
    ("techreport", "report"),
    ("online", "webpage"),
    ("unpublished", "manuscript"),
    ("manual", "book"),
    ("proceedings", "book"),
    ("misc", "document"),
];

/// One parsed `@type{key, ...}` block before conversion.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawBibTexEntry {
    /// Lowercased entry type.
    pub(crate) entry_type: String,
    pub(crate) cite_key: String,
    /// Lowercased field names with raw (still LaTeX-encoded) values, in source order.
    pub(crate) fields: Vec<(String, String)>,
    /// Byte offset of the `@` that opened the entry.
    pub(crate) offset: usize,
}

impl RawBibTexEntry {
    /// First value for a field name.
    pub(crate) fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First non-blank decoded value among the given field names.
    fn decoded(&self, names: &[&str]) -> Option<String> {
        names
            .iter()
            .filter_map(|name| self.get(name))
            .map(decode_latex)
            .find(|value| !value.is_empty())
    }
}

/// CSL record type for a BibTeX entry type.
pub(crate) fn csl_type(entry_type: &str) -> &'static str {
    TYPE_MAP
        .iter()
        .find(|(bibtex, _)| *bibtex == entry_type)
        .map_or("document", |(_, csl)| *csl)
}

/// BibTeX entry type for a CSL record type.
pub(crate) fn bibtex_type(record_type: &str) -> &'static str {
    TYPE_MAP
        .iter()
        .find(|(_, csl)| *csl == record_type)
        .map_or("misc", |(bibtex, _)| *bibtex)
}

/// Split a BibTeX author list on ` and ` outside braces.
fn split_names(value: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let bytes = value.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b if depth == 0 && b.is_ascii_whitespace() => {
                let rest = &value[i..];
                let word = rest.trim_start();
                if word.get(..3).is_some_and(|w| w.eq_ignore_ascii_case("and"))
                    && word.as_bytes().get(3).is_some_and(u8::is_ascii_whitespace)
                {
                    names.push(&value[start..i]);
                    let skipped = rest.len() - word.len() + 3;
                    i += skipped;
                    start = i;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }
    names.push(&value[start..]);
    names
        .into_iter()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Inner text of a name wrapped in one brace group, e.g. `{World Health Organization}`.
///
/// Such names are literal family names and are not split into parts.
fn single_brace_group(name: &str) -> Option<&str> {
    let inner = name.strip_prefix('{')?.strip_suffix('}')?;
    let mut depth = 0usize;
    for c in inner.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.checked_sub(1)?,
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

/// Leading run of digits as a year, e.g. `2020` from `2020-05-01` or `2020a`.
fn leading_year(value: &str) -> Option<i32> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

impl From<RawBibTexEntry> for Reference {
    fn from(raw: RawBibTexEntry) -> Self {
        let authors: Vec<Name> = raw
            .get("author")
            .map(|value| {
                split_names(value)
                    .into_iter()
                    .filter(|name| *name != "others")
                    .map(|name| match single_brace_group(name) {
                        Some(literal) => Name::new(decode_latex(literal), None),
                        None => parse_author_name(&decode_latex(name)),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let year = match raw.get("year").map(|y| (y, leading_year(y))) {
            Some((_, Some(year))) => Some(year),
            Some((value, None)) => {
                tracing::warn!(cite_key = %raw.cite_key, value, "ignoring unparseable year");
                raw.get("date").and_then(leading_year)
            }
            None => raw.get("date").and_then(leading_year),
        };

        let id = if raw.cite_key.is_empty() {
            utils::generate_id()
        } else {
            raw.cite_key.clone()
        };

        Reference {
            id,
            record_type: csl_type(&raw.entry_type).to_string(),
            title: raw.decoded(&["title"]),
            authors,
            issued: year.map(Issued::from_year),
            container_title: raw.decoded(&["journal", "journaltitle", "booktitle"]),
            volume: raw.decoded(&["volume"]),
            issue: raw.decoded(&["number", "issue"]),
            pages: raw.decoded(&["pages"]).map(|p| p.replace("--", "-")),
            doi: raw.get("doi").and_then(utils::normalize_doi),
            url: raw.get("url").map(collapse_whitespace).filter(|u| !u.is_empty()),
            publisher: raw.decoded(&["publisher"]),
        }
    }
}

/// Whether every `}` closes an earlier `{`, and all are closed.
fn braces_balanced(value: &str) -> bool {
    let mut depth = 0i64;
    for c in value.chars() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Whether BibTeX accepts `c` inside a cite key.
fn is_cite_key_char(c: char) -> bool {
    !c.is_whitespace() && !",{}()=\"#%@\\".contains(c)
}

/// Cite key for a record.
///
/// The id is used when BibTeX accepts it as a key. Otherwise (an empty id, or
/// a DOI id with parentheses) the key is `<family><year><firstTitleWord>`,
/// falling back to the id with the offending characters removed.
fn cite_key_for(reference: &Reference) -> String {
    if !reference.id.is_empty() && reference.id.chars().all(is_cite_key_char) {
        return reference.id.clone();
    }
    let family = reference.first_author_family().unwrap_or_default();
    let year = reference.year().map(|y| y.to_string()).unwrap_or_default();
    let word = reference
        .title()
        .and_then(|t| t.split_whitespace().next())
        .unwrap_or_default();
    let key: String = format!("{family}{year}{word}")
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    if !key.is_empty() {
        return key;
    }
    let sanitized: String = reference.id.chars().filter(|c| is_cite_key_char(*c)).collect();
    if sanitized.is_empty() { "ref".to_string() } else { sanitized }
}

/// Format a record's authors as `Family, Given and Family, Given`.
fn format_names(authors: &[Name]) -> String {
    authors
        .iter()
        .map(|name| match non_empty(&name.given) {
            Some(given) => format!("{}, {}", name.family, given),
            None => name.family.clone(),
        })
        .join(" and ")
}

/// Write one record as a BibTeX entry.
pub(crate) fn write_entry(reference: &Reference) -> Result<String, ExportError> {
    let key = cite_key_for(reference);
    let year = reference.year().map(|y| y.to_string());
    let candidates: [(&'static str, Option<String>); 10] = [
        (fields::AUTHOR, (!reference.authors.is_empty()).then(|| format_names(&reference.authors))),
        (fields::TITLE, reference.title().map(str::to_string)),
        (bibtex_container_field(&reference.record_type), non_empty(&reference.container_title).map(str::to_string)),
        (fields::YEAR, year),
        ("volume", non_empty(&reference.volume).map(str::to_string)),
        ("number", non_empty(&reference.issue).map(str::to_string)),
        ("pages", non_empty(&reference.pages).map(|p| p.replace('-', "--"))),
        ("publisher", non_empty(&reference.publisher).map(str::to_string)),
        (fields::DOI, reference.doi().map(str::to_string)),
        ("url", non_empty(&reference.url).map(str::to_string)),
    ];

    let mut out = format!("@{}{{{},\n", bibtex_type(&reference.record_type), key);
    for (field, value) in candidates {
        let Some(value) = value else { continue };
        if !braces_balanced(&value) {
            return Err(ExportError::UnbalancedBraces { key, field });
        }
        let value = match field {
            fields::DOI | "url" => value,
            _ => escape_latex(&value),
        };
        out.push_str(&format!("\t{} = {{{}}},\n", field, value));
    }
    out.push('}');
    Ok(out)
}

/// Field that holds the container title for a record type.
fn bibtex_container_field(record_type: &str) -> &'static str {
    match bibtex_type(record_type) {
        "inproceedings" | "incollection" | "inbook" => "booktitle",
        _ => "journal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn raw(entry_type: &str, key: &str, fields: &[(&str, &str)]) -> RawBibTexEntry {
        RawBibTexEntry {
            entry_type: entry_type.to_string(),
            cite_key: key.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            offset: 0,
        }
    }

    #[rstest]
    #[case("Smith, John and Doe, Jane", vec!["Smith, John", "Doe, Jane"])]
    #[case("John Smith AND Jane Doe", vec!["John Smith", "Jane Doe"])]
    #[case("{Barnes and Noble} and Smith", vec!["{Barnes and Noble}", "Smith"])]
    #[case("Alexander Anderson", vec!["Alexander Anderson"])]
    #[case("Smith\nand\tDoe", vec!["Smith", "Doe"])]
    #[case("Ёжиков, Иван and Жуков, Пётр", vec!["Ёжиков, Иван", "Жуков, Пётр"])]
    #[case("", vec![])]
    fn test_split_names(#[case] input: &str, #[case] expected: Vec<&str>) {
        assert_eq!(split_names(input), expected);
    }

    #[rstest]
    #[case("article", "article-journal")]
    #[case("inproceedings", "paper-conference")]
    #[case("phdthesis", "thesis")]
    #[case("weird", "document")]
    fn test_csl_type(#[case] bibtex: &str, #[case] csl: &str) {
        assert_eq!(csl_type(bibtex), csl);
    }

    #[rstest]
    #[case("article-journal", "article")]
    #[case("paper-conference", "inproceedings")]
    #[case("thesis", "phdthesis")]
    #[case("dataset", "misc")]
    fn test_bibtex_type(#[case] csl: &str, #[case] bibtex: &str) {
        assert_eq!(bibtex_type(csl), bibtex);
    }

    #[test]
    fn test_raw_entry_to_reference() {
        let entry = raw(
            "article",
            "smith2020",
            &[
                ("author", "M{\\\"u}ller, Hans and Jane Doe and others"),
                ("title", "On {DNA} Repair"),
                ("journal", "Nature"),
                ("year", "2020"),
                ("volume", "12"),
                ("number", "3"),
                ("pages", "100--110"),
                ("doi", "https://doi.org/10.1000/ABC"),
                ("publisher", "Springer \\& Co"),
            ],
        );
        let reference = Reference::from(entry);
        assert_eq!(reference.id, "smith2020");
        assert_eq!(reference.record_type, "article-journal");
        assert_eq!(reference.title(), Some("On DNA Repair"));
        assert_eq!(
            reference.authors,
            vec![
                Name::new("Müller", Some("Hans".into())),
                Name::new("Doe", Some("Jane".into())),
            ]
        );
        assert_eq!(reference.year(), Some(2020));
        assert_eq!(reference.container_title.as_deref(), Some("Nature"));
        assert_eq!(reference.issue.as_deref(), Some("3"));
        assert_eq!(reference.pages.as_deref(), Some("100-110"));
        assert_eq!(reference.doi(), Some("10.1000/ABC"));
        assert_eq!(reference.publisher.as_deref(), Some("Springer & Co"));
    }

    #[test]
    fn test_year_fallbacks() {
        let reference = Reference::from(raw("misc", "a", &[("date", "2019-04-01")]));
        assert_eq!(reference.year(), Some(2019));

        let reference = Reference::from(raw("misc", "a", &[("year", "in press")]));
        assert_eq!(reference.year(), None);
    }

    #[test]
    fn test_empty_cite_key_gets_generated_id() {
        let reference = Reference::from(raw("misc", "", &[("title", "x")]));
        assert!(reference.id.starts_with("ref_"));
    }

    #[test]
    fn test_write_entry() {
        let mut reference = Reference::new("smith2020");
        reference.title = Some("R&D in 100% Practice".into());
        reference.authors = vec![
            Name::new("Smith", Some("John".into())),
            Name::new("Plato", None),
        ];
        reference.issued = Some(Issued::from_year(2020));
        reference.container_title = Some("Journal".into());
        reference.pages = Some("1-10".into());
        reference.doi = Some("10.1000/a_b".into());

        let written = write_entry(&reference).unwrap();
        assert_eq!(
            written,
            "@article{smith2020,\n\
             \tauthor = {Smith, John and Plato},\n\
             \ttitle = {R\\&D in 100\\% Practice},\n\
             \tjournal = {Journal},\n\
             \tyear = {2020},\n\
             \tpages = {1--10},\n\
             \tdoi = {10.1000/a_b},\n\
             }"
        );
    }

    #[test]
    fn test_write_entry_booktitle_for_conference() {
        let mut reference = Reference::new("c");
        reference.record_type = "paper-conference".into();
        reference.container_title = Some("Proc. of Things".into());
        let written = write_entry(&reference).unwrap();
        assert!(written.starts_with("@inproceedings{c,"));
        assert!(written.contains("booktitle = {Proc. of Things}"));
    }

    #[test]
    fn test_write_entry_derives_key() {
        let mut reference = Reference::new("");
        reference.title = Some("Deep Learning".into());
        reference.authors = vec![Name::new("LeCun", Some("Yann".into()))];
        reference.issued = Some(Issued::from_year(2015));
        let written = write_entry(&reference).unwrap();
        assert!(written.starts_with("@article{LeCun2015Deep,"));
    }

    #[rstest]
    #[case("{World Health Organization}", Some("World Health Organization"))]
    #[case("{Barnes and Noble}", Some("Barnes and Noble"))]
    #[case("{{\\\"U}ber Corp}", Some("{\\\"U}ber Corp"))]
    #[case("{A}}{", None)]
    #[case("{Smith}, John", None)]
    #[case("{A} and {B}", None)]
    #[case("John Smith", None)]
    fn test_single_brace_group(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(single_brace_group(name), expected);
    }

    #[rstest]
    #[case("{World Health Organization}", vec![Name::new("World Health Organization", None)])]
    #[case(
        "{World Health Organization} and Doe, Jane",
        vec![
            Name::new("World Health Organization", None),
            Name::new("Doe", Some("Jane".into())),
        ]
    )]
    #[case("{M{\\\"u}ller Group}", vec![Name::new("Müller Group", None)])]
    #[case("{Smith}, John", vec![Name::new("Smith", Some("John".into()))])]
    fn test_braced_author_is_literal(#[case] author: &str, #[case] expected: Vec<Name>) {
        let reference = Reference::from(raw("misc", "k", &[("author", author)]));
        assert_eq!(reference.authors, expected);
    }

    #[rstest]
    #[case("smith2020", None, "smith2020")]
    #[case("10.1000/xyz-1", None, "10.1000/xyz-1")]
    #[case("10.1002/(SICI)1097-4636(199606)31:2", Some("Biomaterials"), "1996Biomaterials")]
    #[case("10.1002/(SICI)1097-4636(199606)31:2", None, "10.1002/SICI1097-463619960631:2")]
    #[case("has space", None, "hasspace")]
    #[case("{}", None, "ref")]
    fn test_cite_key_for(#[case] id: &str, #[case] title: Option<&str>, #[case] expected: &str) {
        let mut reference = Reference::new(id);
        reference.title = title.map(str::to_string);
        reference.issued = title.map(|_| Issued::from_year(1996));
        assert_eq!(cite_key_for(&reference), expected);
    }

    #[test]
    fn test_write_entry_errors() {
        let mut reference = Reference::new("ok");
        reference.title = Some("Broken {brace".into());
        assert!(matches!(
            write_entry(&reference),
            Err(ExportError::UnbalancedBraces { field: "title", .. })
        ));
    }
}
