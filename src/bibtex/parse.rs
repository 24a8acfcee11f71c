//! BibTeX parsing implementation.
//!
//! This module handles the low-level parsing of BibTeX text into raw entries.
//! Text outside `@` blocks is treated as a comment. `@comment` and `@preamble`
//! blocks are skipped, `@string` definitions are expanded in later values, and
//! any malformed `@` block aborts the parse with a positioned [`ParseError`].

use crate::bibtex::structure::RawBibTexEntry;
use crate::error::{ParseError, ValueError, fields};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{cut, map},
    error::{Error as NomError, ErrorKind},
    multi::separated_list1,
    sequence::delimited,
};
use std::collections::HashMap;

type Res<'a, T> = IResult<&'a str, T>;

/// Month macros every BibTeX style predefines.
const MONTH_MACROS: [(&str, &str); 12] = [
    ("jan", "January"),
    ("feb", "February"),
    ("mar", "March"),
    ("apr", "April"),
    ("may", "May"),
    ("jun", "June"),
    ("jul", "July"),
    ("aug", "August"),
    ("sep", "September"),
    ("oct", "October"),
    ("nov", "November"),
    ("dec", "December"),
];

/// Result of parsing one `@` block.
enum AtBlock {
    Entry(RawBibTexEntry),
    String(String, String),
    Skipped,
}

/// One operand of a `#` concatenation.
enum Piece<'a> {
    Literal(&'a str),
    Macro(&'a str),
}

/// Parse BibTeX text into raw entries in source order.
pub(crate) fn bibtex_parse(text: &str) -> Result<Vec<RawBibTexEntry>, ParseError> {
    let mut strings: HashMap<String, String> = MONTH_MACROS
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let mut entries = Vec::new();
    let mut remaining = text;

    while let Some(pos) = remaining.find('@') {
        remaining = &remaining[pos..];
        let offset = text.len() - remaining.len();

        match at_block(remaining, &strings) {
            Ok((rest, block)) => {
                match block {
                    AtBlock::Entry(mut raw) => {
                        raw.offset = offset;
                        entries.push(raw);
                    }
                    AtBlock::String(name, value) => {
                        strings.insert(name.to_lowercase(), value);
                    }
                    AtBlock::Skipped => {}
                }
                remaining = rest;
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                return Err(to_parse_error(text, e));
            }
            Err(nom::Err::Incomplete(_)) => {
                return Err(ParseError::at_offset(
                    text,
                    offset,
                    ValueError::Syntax("incomplete input".to_string()),
                ));
            }
        }
    }

    Ok(entries)
}

/// Translate a nom error into a positioned [`ParseError`].
fn to_parse_error(text: &str, error: NomError<&str>) -> ParseError {
    let offset = text.len() - error.input.len();
    let value_error = match error.code {
        ErrorKind::Eof | ErrorKind::Verify => ValueError::UnbalancedBraces {
            field: fields::ENTRY,
        },
        ErrorKind::Not => ValueError::MissingValue {
            field: field_name_before(&text[..offset]),
        },
        _ => {
            let near: String = error.input.chars().take(20).collect();
            if near.is_empty() {
                ValueError::Syntax("unexpected end of input".to_string())
            } else {
                ValueError::Syntax(format!("unexpected input near '{}'", near.trim_end()))
            }
        }
    };
    ParseError::at_offset(text, offset, value_error)
}

/// Name of the field whose `=` ends `prefix`, e.g. `title` for `@misc{k, title = `.
fn field_name_before(prefix: &str) -> String {
    let before_eq = prefix.trim_end().trim_end_matches('=').trim_end();
    let start = before_eq
        .rfind(|c: char| !is_identifier_char(c))
        .map_or(0, |i| i + before_eq[i..].chars().next().map_or(1, char::len_utf8));
    before_eq[start..].to_lowercase()
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || "_-:.+/".contains(c)
}

fn ws(input: &str) -> Res<'_, &str> {
    multispace0(input)
}

fn identifier(input: &str) -> Res<'_, &str> {
    take_while1(is_identifier_char)(input)
}

fn cite_key(input: &str) -> Res<'_, &str> {
    take_while(|c: char| !c.is_whitespace() && !",{}()=\"#".contains(c))(input)
}

/// Content between matching braces, without the outer pair.
fn braced(input: &str) -> Res<'_, &str> {
    let (rest, _) = char('{')(input)?;
    let mut depth = 1usize;
    for (i, c) in rest.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&rest[i + 1..], &rest[..i]));
                }
            }
            _ => {}
        }
    }
    Err(nom::Err::Failure(NomError::new(input, ErrorKind::Eof)))
}

/// Content between double quotes. Quotes inside braces do not terminate.
fn quoted(input: &str) -> Res<'_, &str> {
    let (rest, _) = char('"')(input)?;
    let mut depth = 0usize;
    for (i, c) in rest.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                if depth == 0 {
                    return Err(nom::Err::Failure(NomError::new(
                        &rest[i..],
                        ErrorKind::Verify,
                    )));
                }
                depth -= 1;
            }
            '"' if depth == 0 => return Ok((&rest[i + 1..], &rest[..i])),
            _ => {}
        }
    }
    Err(nom::Err::Failure(NomError::new(input, ErrorKind::Eof)))
}

/// Body of a `(`-delimited block, up to the `)` at brace depth zero.
fn parenthesized(input: &str) -> Res<'_, &str> {
    let (rest, _) = char('(')(input)?;
    let mut depth = 0usize;
    for (i, c) in rest.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ')' if depth == 0 => return Ok((&rest[i + 1..], &rest[..i])),
            _ => {}
        }
    }
    Err(nom::Err::Failure(NomError::new(input, ErrorKind::Eof)))
}

fn piece(input: &str) -> Res<'_, Piece<'_>> {
    alt((
        map(braced, Piece::Literal),
        map(quoted, Piece::Literal),
        map(digit1, Piece::Literal),
        map(identifier, Piece::Macro),
    ))(input)
}

/// A field value: one or more pieces joined with `#`, macros expanded.
fn field_value<'a>(input: &'a str, strings: &HashMap<String, String>) -> Res<'a, String> {
    let (rest, pieces) = separated_list1(delimited(ws, char('#'), ws), piece)(input)?;
    let mut value = String::new();
    for piece in pieces {
        match piece {
            Piece::Literal(text) => value.push_str(text),
            Piece::Macro(name) => match strings.get(&name.to_lowercase()) {
                Some(expansion) => value.push_str(expansion),
                None => {
                    tracing::warn!(name, "undefined BibTeX string macro, keeping its name");
                    value.push_str(name);
                }
            },
        }
    }
    Ok((rest, value))
}

/// `name = value`
fn field<'a>(input: &'a str, strings: &HashMap<String, String>) -> Res<'a, (String, String)> {
    let (rest, name) = identifier(input)?;
    let (rest, _) = ws(rest)?;
    let (rest, _) = cut(char('='))(rest)?;
    let (rest, _) = ws(rest)?;
    if rest.is_empty() || rest.starts_with([',', '}', ')']) {
        return Err(nom::Err::Failure(NomError::new(rest, ErrorKind::Not)));
    }
    let (rest, value) = cut(|i: &'a str| field_value(i, strings))(rest)?;
    Ok((rest, (name.to_lowercase(), value)))
}

fn at_block<'a>(input: &'a str, strings: &HashMap<String, String>) -> Res<'a, AtBlock> {
    let (rest, _) = char('@')(input)?;
    let (rest, _) = ws(rest)?;
    let (rest, kind) = cut(take_while1(|c: char| c.is_ascii_alphanumeric()))(rest)?;
    let (body, _) = ws(rest)?;
    let kind = kind.to_ascii_lowercase();

    match kind.as_str() {
        "comment" | "preamble" => {
            let (rest, _) = cut(alt((braced, parenthesized)))(body)?;
            Ok((rest, AtBlock::Skipped))
        }
        "string" => {
            let (rest, close) = cut(opening)(body)?;
            let (rest, _) = ws(rest)?;
            let (rest, (name, value)) = cut(|i: &'a str| field(i, strings))(rest)?;
            let (rest, _) = ws(rest)?;
            let (rest, _) = cut(char(close))(rest)?;
            Ok((rest, AtBlock::String(name, value)))
        }
        _ => {
            let (rest, close) = cut(opening)(body)?;
            let (rest, _) = ws(rest)?;
            let (rest, key) = cite_key(rest)?;
            let (rest, fields) = entry_fields(rest, close, strings)?;
            Ok((
                rest,
                AtBlock::Entry(RawBibTexEntry {
                    entry_type: kind,
                    cite_key: key.to_string(),
                    fields,
                    offset: 0,
                }),
            ))
        }
    }
}

/// The opening delimiter of a block, returning the matching closer.
fn opening(input: &str) -> Res<'_, char> {
    map(alt((char('{'), char('('))), |open| {
        if open == '{' { '}' } else { ')' }
    })(input)
}

/// Comma-separated fields up to and including the closing delimiter.
fn entry_fields<'a>(
    input: &'a str,
    close: char,
    strings: &HashMap<String, String>,
) -> Res<'a, Vec<(String, String)>> {
    let mut fields = Vec::new();
    let (mut remaining, _) = ws(input)?;

    loop {
        if let Some(rest) = remaining.strip_prefix(close) {
            return Ok((rest, fields));
        }
        let (rest, _) = cut(char(','))(remaining)?;
        let (rest, _) = ws(rest)?;
        if let Some(rest) = rest.strip_prefix(close) {
            return Ok((rest, fields));
        }
        let (rest, pair) = cut(|i: &'a str| field(i, strings))(rest)?;
        fields.push(pair);
        let (rest, _) = ws(rest)?;
        remaining = rest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn field_of<'a>(raw: &'a RawBibTexEntry, name: &str) -> Option<&'a str> {
        raw.get(name)
    }

    #[test]
    fn test_parse_simple_entry() {
        let input = r#"@article{smith2020,
  title = {A {Great} Paper},
  author = "Smith, John and Doe, Jane",
  year = 2020,
}"#;
        let entries = bibtex_parse(input).unwrap();
        assert_eq!(entries.len(), 1);
        let raw = &entries[0];
        assert_eq!(raw.entry_type, "article");
        assert_eq!(raw.cite_key, "smith2020");
        assert_eq!(field_of(raw, "title"), Some("A {Great} Paper"));
        assert_eq!(field_of(raw, "author"), Some("Smith, John and Doe, Jane"));
        assert_eq!(field_of(raw, "year"), Some("2020"));
    }

    #[test]
    fn test_parse_multiple_entries_with_comments() {
        let input = r#"This text is a comment.
@comment{ignored {nested} block}
@preamble{"\newcommand{\x}{y}"}
@BOOK{first, title = {One}}

% line comment
@InProceedings(second, title = {Two}, booktitle = {Proc})
"#;
        let entries = bibtex_parse(input).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry_type, "book");
        assert_eq!(entries[1].entry_type, "inproceedings");
        assert_eq!(entries[1].cite_key, "second");
        assert_eq!(field_of(&entries[1], "booktitle"), Some("Proc"));
        assert!(entries[1].offset > entries[0].offset);
    }

    #[test]
    fn test_parse_string_macros_and_concatenation() {
        let input = r#"@string{ jph = "Journal of Physics" }
@article{a,
  journal = jph # { Letters},
  month = jan,
  note = undefinedmacro
}"#;
        let entries = bibtex_parse(input).unwrap();
        let raw = &entries[0];
        assert_eq!(field_of(raw, "journal"), Some("Journal of Physics Letters"));
        assert_eq!(field_of(raw, "month"), Some("January"));
        assert_eq!(field_of(raw, "note"), Some("undefinedmacro"));
    }

    #[test]
    fn test_parse_quoted_value_with_braced_quote() {
        let input = r#"@misc{q, title = "Say {"}hi{"}"}"#;
        let entries = bibtex_parse(input).unwrap();
        assert_eq!(field_of(&entries[0], "title"), Some(r#"Say {"}hi{"}"#));
    }

    #[test]
    fn test_parse_empty_and_plain_text() {
        assert!(bibtex_parse("").unwrap().is_empty());
        assert!(bibtex_parse("just some words\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_empty_cite_key() {
        let entries = bibtex_parse("@misc{, title = {No key}}").unwrap();
        assert_eq!(entries[0].cite_key, "");
    }

    #[test]
    fn test_unbalanced_braces_reports_position() {
        let input = "@article{a,\n  title = {Broken\n";
        let err = bibtex_parse(input).unwrap_err();
        assert!(matches!(err.error, ValueError::UnbalancedBraces { .. }));
        assert_eq!(err.line, Some(2));
    }

    #[rstest]
    #[case("@article{k, title = }", "title", 1, 21)]
    #[case("@article{k,\n  year = 2020,\n  Journal = ,\n}", "journal", 3, 13)]
    #[case("@misc(k, note =)", "note", 1, 16)]
    #[case("@string{ jph = }", "jph", 1, 16)]
    fn test_missing_value_names_field(
        #[case] input: &str,
        #[case] field: &str,
        #[case] line: usize,
        #[case] column: usize,
    ) {
        let err = bibtex_parse(input).unwrap_err();
        assert_eq!(
            err.error,
            ValueError::MissingValue {
                field: field.to_string()
            }
        );
        assert_eq!((err.line, err.column), (Some(line), Some(column)));
    }

    #[rstest]
    #[case("@article")]
    #[case("@article{a, title}")]
    #[case("@article{a, title = }")]
    #[case("@article{a title = {x}}")]
    #[case("@{a, title = {x}}")]
    #[case("@article{a, title = {x}")]
    #[case("@article{a, title = \"x}")]
    fn test_malformed_input_is_error(#[case] input: &str) {
        assert!(bibtex_parse(input).is_err(), "expected error for {input:?}");
    }
}
