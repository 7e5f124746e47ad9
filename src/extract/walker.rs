use super::classifier::selector_matches;
use super::snapshot::{CssRule, StyleSheetSnapshot};
use super::usage::UsageIndex;
use crate::utils::js_length;

/// Output of a walk over the document's stylesheets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkOutput {
    /// Critical CSS text, in stylesheet and rule order
    pub css: String,
    /// Summed length of every readable top-level rule
    pub original_size: usize,
}

/// Walk every stylesheet and keep the rules used by the page.
///
/// Unreadable stylesheets are skipped without affecting the others. Size
/// accounting covers every top-level rule of a readable sheet regardless of
/// its kind; selection only considers style rules and the style rules
/// directly inside `@media` blocks.
pub fn walk_stylesheets(sheets: &[StyleSheetSnapshot], index: &UsageIndex) -> WalkOutput {
    let mut output = WalkOutput::default();

    for sheet in sheets {
        let Some(rules) = sheet.rules() else {
            continue;
        };

        output.original_size += rules
            .iter()
            .map(|rule| rule.css_text().map_or(0, js_length))
            .sum::<usize>();

        for rule in rules {
            match rule {
                CssRule::Style { selector_text, .. } => {
                    if selector_matches(selector_text, index) {
                        push_rule(&mut output.css, "", rule);
                    }
                }
                CssRule::Media {
                    condition_text,
                    rules: children,
                    ..
                } => {
                    let content = walk_media_children(children, index);
                    if !content.is_empty() {
                        output.css.push_str("@media ");
                        output.css.push_str(condition_text);
                        output.css.push_str(" {\n");
                        output.css.push_str(&content);
                        output.css.push_str("}\n");
                    }
                }
                CssRule::Other { .. } => {}
            }
        }
    }

    output
}

/// Matched style rules of a media block, indented by two spaces
fn walk_media_children(children: &[CssRule], index: &UsageIndex) -> String {
    let mut content = String::new();
    for child in children {
        // Nested at-rules are not descended into
        if let CssRule::Style { selector_text, .. } = child {
            if selector_matches(selector_text, index) {
                push_rule(&mut content, "  ", child);
            }
        }
    }
    content
}

fn push_rule(buffer: &mut String, indent: &str, rule: &CssRule) {
    buffer.push_str(indent);
    buffer.push_str(rule.css_text().unwrap_or_default());
    buffer.push('\n');
}
