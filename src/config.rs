//! Engine configuration.
//!
//! This module defines the default style, language and template settings
//! used by [`crate::CitationEngine`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default CSL template for each recognized style.
///
/// GOST styles are rendered by the built-in formatter; their entries name
/// the closest CSL template and are only used if a GOST style is delegated.
pub(crate) const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    ("gost-numeric", "vancouver"),
    ("gost-author-date", "apa"),
    ("apa", "apa"),
    ("vancouver", "vancouver"),
    ("harvard", "harvard"),
    ("ieee", "ieee"),
    ("mla", "mla"),
];

/// Configuration for a [`crate::CitationEngine`].
///
/// # Examples
///
/// ```
/// use bibref::EngineConfig;
///
/// let mut config = EngineConfig::new();
/// config.set_default_style("apa").set_default_lang("ru");
/// config.set_template("chicago", "chicago-author-date");
/// assert_eq!(config.template_for("chicago"), "chicago-author-date");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Style used when the caller does not name one
    pub(crate) default_style: String,
    /// Language tag used when the caller does not name one (`ru`, `en`, `cn`)
    pub(crate) default_lang: String,
    /// Style that unrecognized style names resolve to
    pub(crate) fallback_style: String,
    /// Style id to CSL template name
    pub(crate) templates: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Creates a configuration with the default styles and templates
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_style: "gost-numeric".to_string(),
            default_lang: "en".to_string(),
            fallback_style: "apa".to_string(),
            templates: DEFAULT_TEMPLATES
                .iter()
                .map(|(style, template)| (style.to_string(), template.to_string()))
                .collect(),
        }
    }

    /// Loads a configuration from JSON. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the text is not a valid configuration object.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut config: Self = serde_json::from_str(json)?;
        // A partial templates map extends the defaults instead of replacing them.
        for (style, template) in DEFAULT_TEMPLATES {
            config
                .templates
                .entry(style.to_string())
                .or_insert_with(|| template.to_string());
        }
        Ok(config)
    }

    pub fn set_default_style(&mut self, style: &str) -> &mut Self {
        self.default_style = style.to_string();
        self
    }

    pub fn set_default_lang(&mut self, lang: &str) -> &mut Self {
        self.default_lang = lang.to_string();
        self
    }

    pub fn set_fallback_style(&mut self, style: &str) -> &mut Self {
        self.fallback_style = style.to_string();
        self
    }

    /// Maps a style id to a CSL template name, adding the style if it is new
    pub fn set_template(&mut self, style: &str, template: &str) -> &mut Self {
        self.templates.insert(style.to_string(), template.to_string());
        self
    }

    pub fn default_style(&self) -> &str {
        &self.default_style
    }

    pub fn default_lang(&self) -> &str {
        &self.default_lang
    }

    pub fn fallback_style(&self) -> &str {
        &self.fallback_style
    }

    /// Configured style ids and their templates, in name order
    pub fn templates(&self) -> impl Iterator<Item = (&str, &str)> {
        self.templates
            .iter()
            .map(|(style, template)| (style.as_str(), template.as_str()))
    }

    /// CSL template for a style, falling back to the fallback style's name.
    pub fn template_for(&self, style: &str) -> &str {
        self.templates
            .get(style)
            .map_or(self.fallback_style.as_str(), String::as_str)
    }
}
