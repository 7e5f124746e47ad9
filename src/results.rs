use serde::{Deserialize, Serialize};

use crate::utils::{count_open_braces, js_length};

/// Critical CSS extracted from one rendered page, with its statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Matched rules in stylesheet order, one per line
    pub css: String,

    /// Total length of every readable rule's serialization
    pub original_size: usize,

    /// Number of `{` characters in `css`
    pub rules_count: usize,

    /// Number of distinct usage tokens found on visible elements
    pub used_selectors_count: usize,
}

impl ExtractionResult {
    /// Create a new result; the rule count is always derived from `css`
    pub fn new(css: String, original_size: usize, used_selectors_count: usize) -> Self {
        let rules_count = count_open_braces(&css);
        Self {
            css,
            original_size,
            rules_count,
            used_selectors_count,
        }
    }

    /// Size of the critical CSS, measured like `original_size`
    pub fn css_size(&self) -> usize {
        js_length(&self.css)
    }

    /// How much smaller the critical CSS is than the page's full CSS, in percent
    pub fn reduction_percent(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        (1.0 - self.css_size() as f64 / self.original_size as f64) * 100.0
    }
}
