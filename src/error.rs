//! Error types for reference ingestion and formatting.
//!
//! Import and lookup failures are surfaced to the caller ([`ParseError`],
//! [`FetchError`]). Formatting failures ([`FormatFault`]) are recovered inside
//! the engine and never reach callers of the formatting entry points.

use thiserror::Error;

/// A byte-offset span into the original source text.
///
/// Both `start` and `end` are byte offsets (not character indices) from the
/// beginning of the source string.  `start` is inclusive, `end` is exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpan {
    /// Inclusive start byte offset.
    pub start: usize,
    /// Exclusive end byte offset.
    pub end: usize,
}

impl SourceSpan {
    /// Create a new `SourceSpan`.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Field name constants for consistent error reporting.
pub mod fields {
    pub const ENTRY: &str = "entry";
    pub const TITLE: &str = "title";
    pub const AUTHOR: &str = "author";
    pub const YEAR: &str = "year";
    pub const DOI: &str = "doi";
}

/// BibTeX parse error with location and context information.
#[derive(Error, Debug, Clone)]
#[error("Error in BibTeX format{}: {error}",
    match (line, column) {
        (Some(l), Some(c)) => format!(" at line {} column {}", l, c),
        (Some(l), None) => format!(" at line {}", l),
        (None, Some(c)) => format!(" at column {}", c),
        (None, None) => String::new(),
    }
)]
pub struct ParseError {
    /// Line number where the error occurred (1-based, None if not available)
    pub line: Option<usize>,
    /// Column number where the error occurred (1-based, None if not available)
    pub column: Option<usize>,
    /// Byte-offset span into the source text, for rich diagnostic rendering.
    pub span: Option<SourceSpan>,
    /// The specific error that occurred
    pub error: ValueError,
}

impl ParseError {
    /// Create a new ParseError.
    pub fn new(line: Option<usize>, column: Option<usize>, error: ValueError) -> Self {
        Self {
            line,
            column,
            span: None,
            error,
        }
    }

    /// Attach a byte-offset span to this error, returning `self` (builder style).
    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    /// Create a ParseError pointing at a byte offset of `source`.
    ///
    /// Line and column are derived from the offset.
    pub fn at_offset(source: &str, offset: usize, error: ValueError) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..floor_char_boundary(source, offset)];
        let line = before.matches('\n').count() + 1;
        let column = before
            .rfind('\n')
            .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
            + 1;
        Self::new(Some(line), Some(column), error).with_span(SourceSpan::new(offset, offset))
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Specific value-level errors that can occur during parsing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("Bad syntax: {0}")]
    Syntax(String),

    /// A field name followed by `=` but no value.
    #[error("Missing value for {field}")]
    MissingValue { field: String },

    #[error("Unbalanced braces in {field}")]
    UnbalancedBraces { field: &'static str },
}

/// Why a metadata provider could not resolve an identifier.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderErrorKind {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("identifier not found")]
    NotFound,

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A failed lookup reported by a [`crate::provider::MetadataProvider`].
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} (identifier: {identifier})")]
pub struct ProviderError {
    pub identifier: String,
    pub kind: ProviderErrorKind,
}

impl ProviderError {
    pub fn new(identifier: impl Into<String>, kind: ProviderErrorKind) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
        }
    }

    pub fn not_found(identifier: impl Into<String>) -> Self {
        Self::new(identifier, ProviderErrorKind::NotFound)
    }

    pub fn transport(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(identifier, ProviderErrorKind::Transport(message.into()))
    }
}

/// Identifier space of a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierScheme {
    Doi,
    PubMed,
}

impl IdentifierScheme {
    /// Human-readable label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            IdentifierScheme::Doi => "DOI",
            IdentifierScheme::PubMed => "PubMed ID",
        }
    }
}

impl std::fmt::Display for IdentifierScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A lookup through the cache failed because the provider failed.
///
/// Failures are never cached; repeating the call asks the provider again.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Failed to fetch {scheme}: {identifier}. {}", .source.kind)]
pub struct FetchError {
    pub scheme: IdentifierScheme,
    pub identifier: String,
    #[source]
    pub source: ProviderError,
}

impl FetchError {
    /// The provider's failure message.
    pub fn message(&self) -> String {
        self.source.kind.to_string()
    }
}

/// Any failure while rendering a citation. Always recovered by the fallback formatter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatFault {
    #[error("no formatter registered for style {0:?}")]
    UnknownStyle(String),

    #[error("template renderer failed: {0}")]
    Renderer(String),

    #[error("template renderer panicked")]
    RendererPanicked,

    #[error("formatter produced no output")]
    EmptyOutput,
}

/// Why a record could not be written as BibTeX.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExportError {
    #[error("unbalanced braces in field {field} of {key}")]
    UnbalancedBraces { key: String, field: &'static str },
}
