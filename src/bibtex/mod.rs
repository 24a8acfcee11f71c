//! BibTeX import and export.
//!
//! Import is strict: malformed text fails with a [`ParseError`]. Export is
//! forgiving: if any record cannot be written, the whole export degrades to
//! the [`EXPORT_ERROR_MARKER`] comment instead of returning an error, so
//! callers must inspect the returned text.
//!
//! # Example
//!
//! ```
//! use bibref::BibTexCodec;
//!
//! let input = r#"@article{smith2020,
//!   author = {Smith, John},
//!   title = {Example Title},
//!   year = {2020}
//! }"#;
//!
//! let codec = BibTexCodec::new();
//! let references = codec.import(input).unwrap();
//! assert_eq!(references[0].title(), Some("Example Title"));
//!
//! let text = codec.export(&references);
//! assert!(text.starts_with("@article{smith2020,"));
//! ```

mod latex;
mod parse;
mod structure;

use crate::Reference;
use crate::error::{ExportError, ParseError};
use parse::bibtex_parse;
use structure::write_entry;

/// Returned by [`BibTexCodec::export`] when the records cannot be written.
pub const EXPORT_ERROR_MARKER: &str = "% Error exporting to BibTeX";

/// Converts between canonical records and BibTeX text.
#[derive(Debug, Clone, Default)]
pub struct BibTexCodec;

impl BibTexCodec {
    /// Creates a new codec instance.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parses one or more BibTeX entries into canonical records.
    ///
    /// Text outside entries is ignored, so input without entries yields an
    /// empty vector.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the text is not well-formed BibTeX.
    pub fn import(&self, text: &str) -> Result<Vec<Reference>, ParseError> {
        let raw_entries = bibtex_parse(text).inspect_err(|e| {
            tracing::error!(error = %e, "failed to parse BibTeX");
        })?;

        Ok(raw_entries.into_iter().map(Reference::from).collect())
    }

    /// Serializes records as BibTeX, or the error marker if any record cannot be written.
    pub fn export(&self, references: &[Reference]) -> String {
        match self.try_export(references) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "error exporting to BibTeX");
                EXPORT_ERROR_MARKER.to_string()
            }
        }
    }

    /// Serializes records as BibTeX, reporting why a record could not be written.
    ///
    /// Entries are separated by a blank line.
    pub fn try_export(&self, references: &[Reference]) -> Result<String, ExportError> {
        let entries = references
            .iter()
            .map(write_entry)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries.join("\n\n"))
    }
}
