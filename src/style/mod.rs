//! Citation style formatting.
//!
//! A [`StyleRegistry`] maps style ids to [`StyleFormatter`] strategies. GOST
//! styles are rendered by the rule-based [`gost::GostFormatter`]; template
//! styles are delegated to an external [`CslRenderer`] through
//! [`CslTemplateFormatter`]. Formatting through the registry never fails:
//! any [`FormatFault`], including a panicking formatter, is replaced by the
//! output of [`fallback::format_minimal`].

pub mod fallback;
pub mod gost;

mod csl;

pub use csl::{CslRenderer, CslTemplateFormatter};

use crate::Reference;
use crate::config::EngineConfig;
use crate::error::FormatFault;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Style ids recognized out of the box.
pub mod styles {
    pub const GOST_NUMERIC: &str = "gost-numeric";
    pub const GOST_AUTHOR_DATE: &str = "gost-author-date";
    pub const APA: &str = "apa";
    pub const VANCOUVER: &str = "vancouver";
    pub const HARVARD: &str = "harvard";
    pub const IEEE: &str = "ieee";
    pub const MLA: &str = "mla";

    /// All built-in style ids.
    pub const ALL: [&str; 7] = [GOST_NUMERIC, GOST_AUTHOR_DATE, APA, VANCOUVER, HARVARD, IEEE, MLA];

    /// Whether a style id is handled by the built-in GOST formatter.
    pub fn is_gost(style: &str) -> bool {
        style.starts_with("gost")
    }
}

/// Output language of a formatted citation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum Lang {
    Ru,
    #[default]
    En,
    Cn,
}

impl Lang {
    /// Interprets a language tag. Anything other than `ru` or `cn` is English.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "ru" => Lang::Ru,
            "cn" => Lang::Cn,
            _ => Lang::En,
        }
    }

    /// Short language tag (`ru`, `en`, `cn`).
    pub fn tag(&self) -> &'static str {
        match self {
            Lang::Ru => "ru",
            Lang::En => "en",
            Lang::Cn => "cn",
        }
    }

    /// Locale passed to template renderers.
    pub fn locale_tag(&self) -> &'static str {
        match self {
            Lang::Ru => "ru-RU",
            Lang::En => "en-US",
            Lang::Cn => "zh-CN",
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// A strategy that renders one reference as a bibliography entry.
pub trait StyleFormatter: Send + Sync {
    /// Render a reference in the given language.
    ///
    /// # Errors
    ///
    /// Returns a `FormatFault` when the reference cannot be rendered. The
    /// registry recovers from it.
    fn format(&self, reference: &Reference, lang: Lang) -> Result<String, FormatFault>;
}

impl<F> StyleFormatter for F
where
    F: Fn(&Reference, Lang) -> Result<String, FormatFault> + Send + Sync,
{
    fn format(&self, reference: &Reference, lang: Lang) -> Result<String, FormatFault> {
        self(reference, lang)
    }
}

/// Registered formatting strategies, keyed by style id.
#[derive(Clone)]
pub struct StyleRegistry {
    formatters: HashMap<String, Arc<dyn StyleFormatter>>,
    fallback_style: String,
}

impl std::fmt::Debug for StyleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StyleRegistry")
            .field("styles", &self.styles())
            .field("fallback_style", &self.fallback_style)
            .finish()
    }
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self::new(styles::APA)
    }
}

impl StyleRegistry {
    /// Creates an empty registry. Unregistered styles resolve to `fallback_style`.
    pub fn new(fallback_style: &str) -> Self {
        Self {
            formatters: HashMap::new(),
            fallback_style: fallback_style.to_string(),
        }
    }

    /// Creates a registry with the GOST styles and, when a renderer is given,
    /// every template style configured in `config`.
    ///
    /// # Arguments
    ///
    /// * `renderer` - External CSL renderer for non-GOST styles
    /// * `config` - Supplies the fallback style and the style to template map
    pub fn builtin(renderer: Option<Arc<dyn CslRenderer>>, config: &EngineConfig) -> Self {
        let mut registry = Self::new(config.fallback_style());
        registry.register(styles::GOST_NUMERIC, gost::GostFormatter);
        registry.register(styles::GOST_AUTHOR_DATE, gost::GostFormatter);

        if let Some(renderer) = renderer {
            for (style, template) in config.templates() {
                if !styles::is_gost(style) {
                    registry.register(
                        style,
                        CslTemplateFormatter::new(template, Arc::clone(&renderer)),
                    );
                }
            }
        }
        registry
    }

    /// Registers (or replaces) the formatter for a style id.
    pub fn register(
        &mut self,
        style: &str,
        formatter: impl StyleFormatter + 'static,
    ) -> Option<Arc<dyn StyleFormatter>> {
        self.formatters.insert(style.to_string(), Arc::new(formatter))
    }

    /// Registers a formatter that is already shared with other registries.
    pub fn register_shared(
        &mut self,
        style: &str,
        formatter: Arc<dyn StyleFormatter>,
    ) -> Option<Arc<dyn StyleFormatter>> {
        self.formatters.insert(style.to_string(), formatter)
    }

    pub fn contains(&self, style: &str) -> bool {
        self.formatters.contains_key(style)
    }

    /// Registered style ids, sorted.
    pub fn styles(&self) -> Vec<&str> {
        let mut styles: Vec<&str> = self.formatters.keys().map(String::as_str).collect();
        styles.sort_unstable();
        styles
    }

    pub fn fallback_style(&self) -> &str {
        &self.fallback_style
    }

    /// The style id a request for `style` is served by.
    ///
    /// Unregistered ids starting with `gost` are served by the built-in GOST
    /// formatter under their own id.
    pub fn resolve<'a>(&'a self, style: &'a str) -> &'a str {
        if self.contains(style) || styles::is_gost(style) {
            style
        } else {
            &self.fallback_style
        }
    }

    /// Render a reference, reporting why rendering failed.
    ///
    /// Unregistered `gost*` styles use the GOST formatter and any other
    /// unregistered style is served by the fallback style. Panics inside a
    /// formatter are caught and reported as [`FormatFault::RendererPanicked`].
    ///
    /// # Errors
    ///
    /// Returns a `FormatFault` when neither the style nor the fallback style
    /// is registered, or the formatter fails or produces no output.
    pub fn try_format(
        &self,
        reference: &Reference,
        style: &str,
        lang: Lang,
    ) -> Result<String, FormatFault> {
        let resolved = self.resolve(style);
        let formatter: &dyn StyleFormatter = match self.formatters.get(resolved) {
            Some(formatter) => formatter.as_ref(),
            None if styles::is_gost(resolved) => &gost::GostFormatter,
            None => return Err(FormatFault::UnknownStyle(resolved.to_string())),
        };
        tracing::debug!(style, resolved, lang = %lang, "formatting reference");

        let text = catch_unwind(AssertUnwindSafe(|| formatter.format(reference, lang)))
            .map_err(|_| FormatFault::RendererPanicked)??;
        if text.trim().is_empty() {
            return Err(FormatFault::EmptyOutput);
        }
        Ok(text)
    }

    /// Render a reference. Never fails.
    ///
    /// Any fault is logged and replaced by [`fallback::format_minimal`].
    pub fn format(&self, reference: &Reference, style: &str, lang: Lang) -> String {
        self.try_format(reference, style, lang)
            .unwrap_or_else(|fault| {
                tracing::warn!(
                    id = %reference.id,
                    style,
                    error = %fault,
                    "formatting failed, using minimal fallback"
                );
                fallback::format_minimal(reference)
            })
    }
}

/// Form of an in-text citation marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InlineStyle {
    /// `[n]`
    #[default]
    Numeric,
    /// `(Family, Year)`
    AuthorYear,
}

impl InlineStyle {
    /// `numeric` selects [`InlineStyle::Numeric`]; every other tag is author-year.
    pub fn from_tag(tag: &str) -> Self {
        if tag == "numeric" {
            InlineStyle::Numeric
        } else {
            InlineStyle::AuthorYear
        }
    }
}

/// Short in-text marker for a reference.
///
/// `index` is the 1-based position used by numeric citations.
pub fn inline_citation(reference: &Reference, style: InlineStyle, index: usize) -> String {
    match style {
        InlineStyle::Numeric => format!("[{}]", index),
        InlineStyle::AuthorYear => format!(
            "({}, {})",
            reference.first_author_family().unwrap_or(fallback::ANONYMOUS),
            fallback::year_or_nd(reference)
        ),
    }
}
