//! Template processing options.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Options controlling how a template is loaded and how values are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateOptions {
    /// Rejoin macros split across runs when the template is loaded
    pub repair_macros: bool,

    /// XML-escape values passed to `set_value`
    pub escape_values: bool,

    /// Normalize values to Unicode NFC before writing them
    pub normalize_values: bool,

    /// Turn newlines in values into line breaks
    pub line_breaks: bool,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            repair_macros: true,
            escape_values: true,
            normalize_values: false,
            line_breaks: false,
        }
    }
}

impl TemplateOptions {
    /// Create new template options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON document. Missing keys keep their defaults.
    ///
    /// ```
    /// use doctmpl::TemplateOptions;
    ///
    /// let opts = TemplateOptions::from_json(r#"{"line_breaks": true}"#)?;
    /// assert!(opts.line_breaks);
    /// assert!(opts.escape_values);
    /// # Ok::<(), doctmpl::Error>(())
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Enable or disable macro repair at load time.
    pub fn with_repair_macros(mut self, repair: bool) -> Self {
        self.repair_macros = repair;
        self
    }

    /// Enable or disable escaping of substituted values.
    pub fn with_escape_values(mut self, escape: bool) -> Self {
        self.escape_values = escape;
        self
    }

    /// Enable or disable NFC normalization of substituted values.
    pub fn with_normalize_values(mut self, normalize: bool) -> Self {
        self.normalize_values = normalize;
        self
    }

    /// Enable or disable newline to line-break conversion.
    pub fn with_line_breaks(mut self, line_breaks: bool) -> Self {
        self.line_breaks = line_breaks;
        self
    }
}
