//! Pretty diagnostic reporting using [ariadne].
//!
//! Renders BibTeX [`ParseError`]s with source context, underlines and labels.
//! Only compiled when the `diagnostics` Cargo feature is enabled:
//!
//! ```toml
//! [dependencies]
//! bibref = { version = "0.1", features = ["diagnostics"] }
//! ```
//!
//! # Example
//!
//! ```rust
//! use bibref::diagnostics::import_bibtex_with_diagnostics;
//!
//! let source = "@article{key,\n  title = {Unclosed\n";
//! match import_bibtex_with_diagnostics(source, "refs.bib") {
//!     Ok(references) => println!("Imported {} references", references.len()),
//!     Err(report) => eprintln!("{}", report),
//! }
//! ```

use crate::Reference;
use crate::bibtex::BibTexCodec;
use crate::error::ParseError;
use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};

impl ParseError {
    /// Render this error as an ariadne report.
    ///
    /// The returned `String` contains ANSI colour codes.
    ///
    /// # Arguments
    ///
    /// * `filename` - Label shown in the report header (e.g. `"refs.bib"`).
    /// * `source` - The text that was parsed.
    pub fn to_diagnostic(&self, filename: &str, source: &str) -> String {
        let range = self.primary_byte_range(source);
        let mut buf = Vec::new();

        let written = Report::build(ReportKind::Error, (filename, range.clone()))
            .with_config(Config::default().with_index_type(IndexType::Byte))
            .with_message(self.to_string())
            .with_label(
                Label::new((filename, range))
                    .with_message(self.error.to_string())
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }

    /// Byte range of `source` to underline.
    ///
    /// Priority: explicit `span`, then the reported line, then the start of
    /// the file. Empty spans are widened to the character they point at.
    fn primary_byte_range(&self, source: &str) -> std::ops::Range<usize> {
        if let Some(span) = &self.span {
            let start = span.start.min(source.len());
            let end = span.end.clamp(start, source.len());
            if start < end {
                return start..end;
            }
            let width = source
                .get(start..)
                .and_then(|rest| rest.chars().next())
                .map_or(0, char::len_utf8);
            return start..start + width;
        }
        if let Some(line) = self.line {
            let index = line.saturating_sub(1);
            let line_start: usize = source.split('\n').take(index).map(|l| l.len() + 1).sum();
            let line_len = source.split('\n').nth(index).map_or(0, str::len);
            let start = line_start.min(source.len());
            return start..(start + line_len).min(source.len());
        }
        0..0
    }
}

/// Import BibTeX and, on failure, return a rendered report instead of a raw
/// [`ParseError`].
///
/// # Arguments
///
/// * `input` - The BibTeX text.
/// * `filename` - A display label for the source (e.g. a file path).
///
/// # Returns
///
/// `Ok(references)` on success, or `Err(report)` on failure.
pub fn import_bibtex_with_diagnostics(
    input: &str,
    filename: &str,
) -> Result<Vec<Reference>, String> {
    BibTexCodec::new()
        .import(input)
        .map_err(|e| e.to_diagnostic(filename, input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SourceSpan, ValueError, fields};

    #[test]
    fn test_to_diagnostic_with_span() {
        let source = "@article{a,\n  title = {x}\n}\n";
        let err = ParseError::new(Some(1), Some(1), ValueError::Syntax("oops".into()))
            .with_span(SourceSpan::new(0, 8));

        let diag = err.to_diagnostic("test.bib", source);
        assert!(diag.contains("test.bib"));
        assert!(diag.contains("oops"));
    }

    #[test]
    fn test_to_diagnostic_line_only() {
        let source = "@article{a,\n  title = {x}\n}\n";
        let err = ParseError::new(
            Some(2),
            None,
            ValueError::UnbalancedBraces {
                field: fields::TITLE,
            },
        );

        let diag = err.to_diagnostic("test.bib", source);
        assert!(diag.contains("test.bib"));
    }

    #[test]
    fn test_to_diagnostic_no_position() {
        let err = ParseError::new(None, None, ValueError::Syntax("bad input".into()));
        // Must not panic without position info.
        let diag = err.to_diagnostic("test.bib", "some content\n");
        assert!(diag.contains("test.bib"));
    }

    #[test]
    fn test_empty_span_is_widened() {
        let err = ParseError::at_offset("ab\u{e9}", 2, ValueError::Syntax("x".into()));
        assert_eq!(err.primary_byte_range("ab\u{e9}"), 2..4);
    }

    #[test]
    fn test_import_with_diagnostics() {
        let ok = import_bibtex_with_diagnostics("@misc{k, title = {T}}", "refs.bib").unwrap();
        assert_eq!(ok.len(), 1);

        let err = import_bibtex_with_diagnostics("@article{k,\n  title = {T\n", "refs.bib")
            .unwrap_err();
        assert!(err.contains("refs.bib"));
    }
}
