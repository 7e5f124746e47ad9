use std::time::Duration;

/// Length of a string as the browser reports it (UTF-16 code units)
pub fn js_length(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Whether a character belongs to the JavaScript `\s` class.
///
/// Differs from `char::is_whitespace`: U+FEFF is included, U+0085 is not.
pub fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\u{0B}'
            | '\u{0C}'
            | '\r'
            | ' '
            | '\u{A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
            | '\u{FEFF}'
    )
}

/// Count the opening braces in a CSS text.
///
/// This is a textual proxy for the number of rules: every emitted rule and
/// every `@media` wrapper contributes one brace, and so does any literal `{`
/// inside a declaration value.
pub fn count_open_braces(css: &str) -> usize {
    css.matches('{').count()
}

/// Format an elapsed duration the way log records carry it, e.g. `"153ms"`
pub fn format_duration(elapsed: Duration) -> String {
    format!("{}ms", elapsed.as_millis())
}
