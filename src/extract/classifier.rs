use super::usage::UsageIndex;
use crate::utils::is_js_whitespace;

/// Characters that separate selector fragments: list commas, whitespace and
/// the child/sibling combinators.
fn is_fragment_boundary(c: char) -> bool {
    c == ',' || is_js_whitespace(c) || matches!(c, '>' | '+' | '~')
}

/// Split a selector list into the fragments compared against the index
pub fn selector_fragments(selector_text: &str) -> impl Iterator<Item = &str> {
    selector_text
        .split(is_fragment_boundary)
        .filter(|fragment| !fragment.is_empty())
}

/// Decide whether a style rule is used by the page.
///
/// A rule is kept when any fragment of its selector appears verbatim in the
/// index. Structure is not evaluated: `.nav a` matches on `a` alone, while a
/// compound fragment such as `.card.featured` or `a:hover` only matches if
/// that exact text is a token.
pub fn selector_matches(selector_text: &str, index: &UsageIndex) -> bool {
    selector_fragments(selector_text).any(|fragment| index.contains(fragment))
}
