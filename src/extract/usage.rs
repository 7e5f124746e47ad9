use std::collections::HashSet;

use super::snapshot::ElementSnapshot;
use crate::utils::is_js_whitespace;

/// Selector fragments (`tag`, `#id`, `.class`) seen on visible elements.
///
/// Built once per extraction and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct UsageIndex {
    tokens: HashSet<String>,
}

impl UsageIndex {
    /// Build the index from every element of the document.
    ///
    /// Hidden elements (`display: none` or `visibility: hidden`) contribute
    /// nothing. Each visible element adds its lower-cased tag name, `#id` for
    /// a non-empty id and `.class` for every class in its class attribute.
    pub fn from_elements<'a, I>(elements: I) -> Self
    where
        I: IntoIterator<Item = &'a ElementSnapshot>,
    {
        let mut tokens = HashSet::new();

        for element in elements.into_iter().filter(|el| el.is_visible()) {
            if let Some(id) = element.id.as_deref().filter(|id| !id.is_empty()) {
                tokens.insert(format!("#{}", id));
            }

            // SVG elements have no plain class string and only add their tag
            if let Some(class_name) = &element.class_name {
                let classes = class_name.split(is_js_whitespace).filter(|c| !c.is_empty());
                for class in classes {
                    tokens.insert(format!(".{}", class));
                }
            }

            tokens.insert(element.tag_name.to_lowercase());
        }

        ::log::trace!("Usage index built with {} tokens", tokens.len());
        Self { tokens }
    }

    /// Whether a selector fragment was seen
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    /// Number of distinct tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when no visible element was found
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
