use crate::extract::extract_critical_css;
use crate::extract::snapshot::{CssRule, ElementSnapshot, PageSnapshot, StyleSheetSnapshot};

fn rule(selector: &str, css_text: &str) -> CssRule {
    CssRule::Style {
        selector_text: selector.to_string(),
        css_text: Some(css_text.to_string()),
    }
}

#[cfg(test)]
mod extraction_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_visible_element() {
        let snapshot = PageSnapshot {
            elements: vec![ElementSnapshot::visible("DIV").with_id("x").with_class("a b")],
            style_sheets: vec![StyleSheetSnapshot::readable(vec![
                rule("#x", "#x{color:red}"),
                rule(".a", ".a{margin:0}"),
                rule(".c", ".c{padding:0}"),
                rule("span", "span{display:none}"),
            ])],
        };

        let result = extract_critical_css(&snapshot);
        assert!(result.css.contains("#x{color:red}"));
        assert!(result.css.contains(".a{margin:0}"));
        assert!(!result.css.contains(".c{padding:0}"));
        assert!(!result.css.contains("span{display:none}"));
        assert_eq!(result.used_selectors_count, 4);
        assert_eq!(result.rules_count, 2);
        assert_eq!(result.original_size, 13 + 12 + 13 + 18);
    }

    #[test]
    fn test_hidden_element_tag_not_indexed() {
        let snapshot = PageSnapshot {
            elements: vec![
                ElementSnapshot::visible("DIV").with_class("a"),
                ElementSnapshot::visible("SPAN").with_style("none", "visible"),
            ],
            style_sheets: vec![StyleSheetSnapshot::readable(vec![rule("span", "span{}")])],
        };

        let result = extract_critical_css(&snapshot);
        assert_eq!(result.css, "");
        assert_eq!(result.used_selectors_count, 2);
        assert_eq!(result.rules_count, 0);
    }

    #[test]
    fn test_rules_count_includes_media_wrappers() {
        let snapshot = PageSnapshot {
            elements: vec![ElementSnapshot::visible("P")],
            style_sheets: vec![StyleSheetSnapshot::readable(vec![
                rule("p", "p { color: red; }"),
                CssRule::media(
                    "(min-width: 768px)",
                    vec![
                        CssRule::style("p", "font-size: 18px;"),
                        CssRule::style("h1", "font-size: 32px;"),
                    ],
                ),
                rule("p::before", "p::before { content: \"{\"; }"),
            ])],
        };

        let result = extract_critical_css(&snapshot);
        assert!(result.css.starts_with("p { color: red; }\n@media (min-width: 768px) {\n"));
        assert_eq!(result.rules_count, result.css.matches('{').count());
        // p, @media, the media child; the ::before rule is not matched
        assert_eq!(result.rules_count, 3);
    }

    #[test]
    fn test_from_page_json() {
        let raw = json!({
            "elements": [
                {"tagName": "HTML", "id": "", "className": "", "display": "block", "visibility": "visible"},
                {"tagName": "BODY", "id": "", "className": "home", "display": "block", "visibility": "visible"},
                {"tagName": "circle", "id": "", "className": null, "display": "inline", "visibility": "visible"}
            ],
            "styleSheets": [
                {"href": "https://fonts.example.net/css", "error": "SecurityError"},
                {"href": null, "rules": [
                    {"kind": "style", "selectorText": "body.home", "cssText": "body.home { margin: 0px; }"},
                    {"kind": "style", "selectorText": ".home", "cssText": ".home { padding: 0px; }"},
                    {"kind": "style", "selectorText": "circle", "cssText": "circle { fill: red; }"},
                    {"kind": "other", "type": 7, "cssText": "@keyframes spin { }"}
                ]}
            ]
        });

        let snapshot: PageSnapshot = serde_json::from_value(raw).unwrap();
        let result = extract_critical_css(&snapshot);
        assert_eq!(result.css, ".home { padding: 0px; }\ncircle { fill: red; }\n");
        assert_eq!(result.used_selectors_count, 4);
    }

    #[test]
    fn test_empty_page() {
        let result = extract_critical_css(&PageSnapshot::default());
        assert_eq!(result.css, "");
        assert_eq!(result.original_size, 0);
        assert_eq!(result.rules_count, 0);
        assert_eq!(result.used_selectors_count, 0);
    }
}
