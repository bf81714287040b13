//! String literal quoting and identifier validity.

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

/// Words that can never be used as identifiers, including the ES3 future
/// reserved words.
static RESERVED_WORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "break", "case", "catch", "continue", "debugger", "default", "delete", "do", "else",
        "finally", "for", "function", "if", "in", "instanceof", "new", "return", "switch",
        "this", "throw", "try", "typeof", "var", "void", "while", "with", "null", "true",
        "false", "abstract", "boolean", "byte", "char", "class", "const", "double", "enum",
        "export", "extends", "final", "float", "goto", "implements", "import", "int",
        "interface", "long", "native", "package", "private", "protected", "public", "short",
        "static", "super", "synchronized", "throws", "transient", "volatile",
    ]
    .into_iter()
    .collect()
});

pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS.contains(word)
}

pub fn is_identifier_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

pub fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_alphanumeric()
}

/// Whether `name` could appear as an identifier in source text.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if is_identifier_start(c) => {}
        _ => return false,
    }
    chars.all(is_identifier_part) && !is_reserved_word(name)
}

/// Render `value` as a single-quoted JavaScript string literal.
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\u{b}' => out.push_str("\\v"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Decode the source text of a string literal, quotes included, into the
/// string it denotes. Malformed escapes decode to the escaped character.
pub fn unquote_string(raw: &str) -> String {
    let inner = if raw.len() >= 2 && (raw.starts_with('\'') || raw.starts_with('"')) {
        &raw[1..raw.len() - 1]
    } else {
        raw
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(esc) = chars.next() else {
            break;
        };
        let next_is_digit = chars.peek().is_some_and(|d| d.is_ascii_digit());
        match esc {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !next_is_digit => out.push('\0'),
            'x' => push_hex_escape(&mut out, &mut chars, 2, esc),
            'u' => push_hex_escape(&mut out, &mut chars, 4, esc),
            // Line continuation.
            '\n' | '\u{2028}' | '\u{2029}' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn push_hex_escape(
    out: &mut String,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    digits: usize,
    esc: char,
) {
    let mut lookahead = chars.clone();
    let mut code = 0u32;
    for _ in 0..digits {
        match lookahead.next().and_then(|d| d.to_digit(16)) {
            Some(d) => code = code * 16 + d,
            None => {
                out.push(esc);
                return;
            }
        }
    }
    for _ in 0..digits {
        chars.next();
    }
    out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquote_handles_escapes_and_either_quote() {
        assert_eq!(unquote_string(r#"'a\'b'"#), "a'b");
        assert_eq!(unquote_string(r#""\x41B\n""#), "AB\n");
        assert_eq!(unquote_string(r#"'\q'"#), "q");
    }

    #[test]
    fn quote_then_unquote_preserves_value() {
        let value = "it's a\ttab\\";
        assert_eq!(unquote_string(&quote_string(value)), value);
    }

    #[test]
    fn identifier_validity() {
        assert!(is_valid_identifier("foo_$1"));
        assert!(!is_valid_identifier("1foo"));
        assert!(!is_valid_identifier("with"));
        assert!(!is_valid_identifier("a-b"));
        assert!(!is_valid_identifier(""));
    }
}
