use serde::{Deserialize, Serialize};

/// Script evaluated inside the rendered page to collect a [`PageSnapshot`]
pub const SNAPSHOT_SCRIPT: &str = include_str!("snapshot.js");

/// Everything the extraction needs from a rendered page, captured in one pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    /// Every element of the document, in document order
    #[serde(default)]
    pub elements: Vec<ElementSnapshot>,

    /// Stylesheets attached to the document, in document order
    #[serde(default)]
    pub style_sheets: Vec<StyleSheetSnapshot>,
}

/// One DOM element with the computed styles that decide its visibility
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSnapshot {
    /// Tag name as the DOM reports it (upper-case for HTML elements)
    pub tag_name: String,

    /// Value of the `id` attribute, if any
    #[serde(default)]
    pub id: Option<String>,

    /// Raw class attribute; `None` when the element's class name is not a
    /// plain string (SVG elements expose an animated value instead)
    #[serde(default)]
    pub class_name: Option<String>,

    /// Computed `display`
    #[serde(default)]
    pub display: String,

    /// Computed `visibility`
    #[serde(default)]
    pub visibility: String,
}

impl ElementSnapshot {
    /// Create an element that is displayed and visible
    pub fn visible(tag_name: &str) -> Self {
        Self {
            tag_name: tag_name.to_string(),
            id: None,
            class_name: None,
            display: "block".to_string(),
            visibility: "visible".to_string(),
        }
    }

    /// Set the `id` attribute
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Set the class attribute
    pub fn with_class(mut self, class_name: &str) -> Self {
        self.class_name = Some(class_name.to_string());
        self
    }

    /// Override the computed `display` and `visibility`
    pub fn with_style(mut self, display: &str, visibility: &str) -> Self {
        self.display = display.to_string();
        self.visibility = visibility.to_string();
        self
    }

    /// Whether a user would see this element on first paint
    pub fn is_visible(&self) -> bool {
        self.display != "none" && self.visibility != "hidden"
    }
}

/// A stylesheet whose rule list could or could not be read
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleSheetSnapshot {
    /// Rules were accessible
    Readable {
        #[serde(default)]
        href: Option<String>,
        rules: Vec<CssRule>,
    },
    /// Reading the rule list threw (typically a cross-origin sheet)
    Unreadable {
        #[serde(default)]
        href: Option<String>,
        error: String,
    },
}

impl StyleSheetSnapshot {
    /// Create a readable stylesheet from its rules
    pub fn readable(rules: Vec<CssRule>) -> Self {
        Self::Readable { href: None, rules }
    }

    /// Create a stylesheet whose rules could not be read
    pub fn unreadable(href: &str, error: &str) -> Self {
        Self::Unreadable {
            href: Some(href.to_string()),
            error: error.to_string(),
        }
    }

    /// The sheet's rules, or `None` when access was denied
    pub fn rules(&self) -> Option<&[CssRule]> {
        match self {
            Self::Readable { rules, .. } => Some(rules),
            Self::Unreadable { .. } => None,
        }
    }
}

/// One CSS rule as exposed by the CSS object model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CssRule {
    /// A plain style rule
    #[serde(rename_all = "camelCase")]
    Style {
        selector_text: String,
        #[serde(default)]
        css_text: Option<String>,
    },
    /// A `@media` block and its child rules
    #[serde(rename_all = "camelCase")]
    Media {
        condition_text: String,
        #[serde(default)]
        css_text: Option<String>,
        #[serde(default)]
        rules: Vec<CssRule>,
    },
    /// Any other at-rule (font-face, keyframes, import, ...)
    #[serde(rename_all = "camelCase")]
    Other {
        #[serde(default)]
        css_text: Option<String>,
    },
}

impl CssRule {
    /// Build a style rule, serialized as `selector { body }`
    pub fn style(selector_text: &str, body: &str) -> Self {
        Self::Style {
            selector_text: selector_text.to_string(),
            css_text: Some(format!("{} {{ {} }}", selector_text, body)),
        }
    }

    /// Build a media rule around the given children
    pub fn media(condition_text: &str, rules: Vec<CssRule>) -> Self {
        let inner: Vec<&str> = rules.iter().filter_map(CssRule::css_text).collect();
        Self::Media {
            condition_text: condition_text.to_string(),
            css_text: Some(format!(
                "@media {} {{\n  {}\n}}",
                condition_text,
                inner.join("\n  ")
            )),
            rules,
        }
    }

    /// Serialized text of the rule, if the engine provided one
    pub fn css_text(&self) -> Option<&str> {
        match self {
            Self::Style { css_text, .. }
            | Self::Media { css_text, .. }
            | Self::Other { css_text } => css_text.as_deref(),
        }
    }
}
