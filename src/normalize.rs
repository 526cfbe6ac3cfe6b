//! Per-channel cleaning applied to extracted spans before tokenization.

use std::sync::LazyLock;

use regex::Regex;

use crate::html::collapse_whitespace;

static HASH_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)#.*$").unwrap());
static LINE_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)//.*$").unwrap());
static BLOCK_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static PUNCT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([^\w\s])").unwrap());

/// JSON escape sequences surviving as literal backslash pairs in scraped
/// strings. Applied in listed order: the `\\` pair must resolve after the
/// whitespace escapes and before `\/`.
const ESCAPE_MAPPING: &[(&str, &str)] = &[
    ("\\\"", "\""),
    ("\\n", " "),
    ("\\t", " "),
    ("\\r", " "),
    ("\\\\", "\\"),
    ("\\/", "/"),
];

pub fn unescape_json(text: &str) -> String {
    let mut out = text.to_string();
    for (escaped, unescaped) in ESCAPE_MAPPING {
        out = out.replace(escaped, unescaped);
    }
    out
}

/// Prose channel: lower-case, keep only lowercase letters, digits, periods
/// and whitespace, collapse runs.
pub fn normalize_text(text: &str) -> String {
    let lowered = unescape_json(text).to_lowercase();
    let filtered: String = lowered
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    collapse_whitespace(&filtered)
}

/// Code channel: strip comments, collapse whitespace, then pad every
/// non-word character with spaces so operators and brackets tokenize as
/// standalone units. Case is preserved.
pub fn normalize_code(code: &str) -> String {
    let code = unescape_json(code);
    let code = HASH_COMMENT_RE.replace_all(&code, "");
    let code = LINE_COMMENT_RE.replace_all(&code, "");
    let code = BLOCK_COMMENT_RE.replace_all(&code, "");
    let code = collapse_whitespace(&code);
    let code = PUNCT_RE.replace_all(&code, " $1 ");
    code.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_maps_whitespace_to_space() {
        assert_eq!(unescape_json("a\\nb\\tc\\rd"), "a b c d");
    }

    #[test]
    fn unescape_quotes_and_slashes() {
        assert_eq!(unescape_json(r#"say \"hi\" at a\/b"#), r#"say "hi" at a/b"#);
    }

    #[test]
    fn unescape_backslash_pair() {
        assert_eq!(unescape_json(r"C:\\temp"), r"C:\temp");
    }

    #[test]
    fn text_keeps_only_letters_digits_periods() {
        assert_eq!(
            normalize_text("What's the Output of f(x)? ~3.14!"),
            "what s the output of f x 3.14"
        );
    }

    #[test]
    fn text_collapses_whitespace() {
        assert_eq!(normalize_text("  a   b\n\nc "), "a b c");
    }

    #[test]
    fn code_strips_hash_comment() {
        let out = normalize_code("x=1  # comment\ny=2");
        let tokens: Vec<&str> = out.split_whitespace().collect();
        assert_eq!(tokens, vec!["x", "=", "1", "y", "=", "2"]);
        assert!(!out.contains("comment"));
    }

    #[test]
    fn code_strips_line_and_block_comments() {
        let out = normalize_code("a = b; // trailing\n/* multi\nline */ c = d;");
        assert!(!out.contains("trailing"));
        assert!(!out.contains("multi"));
        assert!(out.contains('c'));
    }

    #[test]
    fn code_pads_punctuation() {
        let out = normalize_code("foo(bar,baz)==qux");
        let tokens: Vec<&str> = out.split_whitespace().collect();
        assert_eq!(
            tokens,
            vec!["foo", "(", "bar", ",", "baz", ")", "=", "=", "qux"]
        );
    }

    #[test]
    fn code_preserves_case() {
        assert!(normalize_code("MyClass.method()").contains("MyClass"));
    }
}
