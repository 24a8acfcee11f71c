//! Delegation of template styles to an external CSL processor.

use super::{Lang, StyleFormatter};
use crate::Reference;
use crate::error::FormatFault;
use std::sync::Arc;

/// An external CSL processor.
///
/// The engine treats it as opaque: errors and panics are both absorbed by
/// the registry's fallback.
pub trait CslRenderer: Send + Sync {
    /// Render `reference` as a bibliography entry.
    ///
    /// # Arguments
    ///
    /// * `reference` - The record, in CSL-JSON shape
    /// * `template` - CSL template name (`apa`, `vancouver`, ...)
    /// * `locale` - CSL locale (`en-US`, `ru-RU`, `zh-CN`)
    fn render(&self, reference: &Reference, template: &str, locale: &str) -> Result<String, String>;
}

/// Formats a style by rendering one CSL template.
#[derive(Clone)]
pub struct CslTemplateFormatter {
    template: String,
    renderer: Arc<dyn CslRenderer>,
}

impl CslTemplateFormatter {
    pub fn new(template: &str, renderer: Arc<dyn CslRenderer>) -> Self {
        Self {
            template: template.to_string(),
            renderer,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl StyleFormatter for CslTemplateFormatter {
    fn format(&self, reference: &Reference, lang: Lang) -> Result<String, FormatFault> {
        let text = self
            .renderer
            .render(reference, &self.template, lang.locale_tag())
            .map_err(FormatFault::Renderer)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(FormatFault::EmptyOutput);
        }
        Ok(text.to_string())
    }
}
