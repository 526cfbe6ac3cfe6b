//! Best-effort repair of structurally broken scrape JSON.
//!
//! The scrape writes post HTML into JSON by string concatenation, so code
//! blocks leak raw newlines and quotes into string literals, commas go
//! missing between objects, and files may lack the outer array brackets.
//! Repair runs fixed stages in order; the result is still only a candidate
//! and the caller must attempt a real parse.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::records::RawRecord;

static CODE_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<code>(.*?)</code>").unwrap());
static OBJECT_GAP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\}\s*\{").unwrap());
static TRAILING_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",(\s*[}\]])").unwrap());

/// Bytes of context captured on each side of a parse error offset.
const ERROR_CONTEXT_RADIUS: usize = 200;

#[derive(Debug, Error)]
pub enum RepairError {
    #[error("JSON parse failed at byte {offset}: {message}")]
    Parse {
        offset: usize,
        message: String,
        context: String,
    },
    #[error("no valid entries found")]
    NoValidEntries,
}

/// Full repair: code-span escaping followed by structural fixes.
pub fn repair(raw: &str) -> String {
    fix_structure(&escape_code_spans(raw))
}

/// Re-escape the inner text of every `<code>...</code>` span so it is safe
/// inside a JSON string literal.
pub fn escape_code_spans(raw: &str) -> String {
    CODE_SPAN_RE
        .replace_all(raw, |caps: &Captures| {
            format!("<code>{}</code>", sanitize_code_block(&caps[1]))
        })
        .into_owned()
}

/// Backslashes are doubled first; everything after only introduces escapes
/// over already-safe text.
fn sanitize_code_block(code: &str) -> String {
    let code = code.replace('\\', "\\\\");
    let code = code.replace('"', "\\\"");
    let code = code
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t");
    escape_bare_slashes(&code)
}

fn escape_bare_slashes(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut prev_backslash = false;
    for ch in code.chars() {
        if ch == '/' && !prev_backslash {
            out.push('\\');
        }
        out.push(ch);
        prev_backslash = ch == '\\';
    }
    out
}

/// Structural fixes: BOM/whitespace trim, outer array brackets, missing
/// commas between adjacent objects, trailing commas.
pub fn fix_structure(content: &str) -> String {
    let mut content = content
        .trim()
        .trim_start_matches('\u{feff}')
        .trim_start()
        .to_string();

    if !content.starts_with('[') {
        content.insert(0, '[');
    }
    if !content.ends_with(']') {
        content.push(']');
    }

    let content = OBJECT_GAP_RE.replace_all(&content, "},{");
    TRAILING_COMMA_RE.replace_all(&content, "$1").into_owned()
}

/// Parse repaired text into records, dropping elements that lack a
/// `question` field or an `answers` array.
///
/// Returns the surviving records plus the dropped-element count. Parse
/// failure carries the byte offset and a surrounding context window; zero
/// survivors is an error of its own.
pub fn parse_records(repaired: &str) -> Result<(Vec<RawRecord>, usize), RepairError> {
    let values: Vec<Value> = serde_json::from_str(repaired).map_err(|err| {
        let offset = byte_offset(repaired, err.line(), err.column());
        RepairError::Parse {
            offset,
            message: err.to_string(),
            context: context_window(repaired, offset, ERROR_CONTEXT_RADIUS),
        }
    })?;

    let total = values.len();
    let mut records = Vec::with_capacity(total);
    for (index, value) in values.into_iter().enumerate() {
        if !has_required_shape(&value) {
            warn!(index, "skipping entry without question/answers");
            continue;
        }
        match serde_json::from_value::<RawRecord>(value) {
            Ok(record) => records.push(record),
            Err(err) => warn!(index, %err, "skipping malformed entry"),
        }
    }

    if records.is_empty() {
        return Err(RepairError::NoValidEntries);
    }
    let dropped = total - records.len();
    Ok((records, dropped))
}

fn has_required_shape(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    obj.contains_key("question") && obj.get("answers").is_some_and(Value::is_array)
}

fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    let line_start = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum::<usize>();
    (line_start + column.saturating_sub(1)).min(text.len())
}

fn context_window(text: &str, offset: usize, radius: usize) -> String {
    let mut start = offset.saturating_sub(radius);
    while start < text.len() && !text.is_char_boundary(start) {
        start += 1;
    }
    let mut end = (offset + radius).min(text.len());
    while end > start && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[start..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_missing_outer_brackets() {
        let raw = r#"{"question":"a","answers":[]},{"question":"b","answers":[]}"#;
        let repaired = repair(raw);
        let parsed: Vec<Value> = serde_json::from_str(&repaired).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn removes_trailing_comma() {
        let repaired = repair(r#"[{"a":1},]"#);
        let parsed: Vec<Value> = serde_json::from_str(&repaired).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn inserts_comma_between_objects() {
        let raw = "[{\"question\":\"a\",\"answers\":[]}\n{\"question\":\"b\",\"answers\":[]}]";
        let parsed: Vec<Value> = serde_json::from_str(&repair(raw)).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn strips_bom() {
        let raw = "\u{feff}[{\"question\":\"a\",\"answers\":[]}]";
        let parsed: Vec<Value> = serde_json::from_str(&repair(raw)).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn escapes_raw_newlines_in_code_spans() {
        let raw = "[{\"question\":\"<p>q</p><code>x = 1\ny = 2</code>\",\"answers\":[]}]";
        let repaired = repair(raw);
        let parsed: Vec<Value> = serde_json::from_str(&repaired).unwrap();
        let question = parsed[0]["question"].as_str().unwrap();
        assert!(question.contains("x = 1 y = 2") || question.contains("x = 1\ny = 2"));
    }

    #[test]
    fn escapes_quotes_and_backslashes_in_code_spans() {
        let out = escape_code_spans(r#"<code>print("a\b")</code>"#);
        assert_eq!(out, r#"<code>print(\"a\\b\")</code>"#);
    }

    #[test]
    fn escapes_bare_slashes_only() {
        let out = escape_code_spans("<code>path/to\\/file</code>");
        assert_eq!(out, "<code>path\\/to\\\\/file</code>");
    }

    #[test]
    fn parse_drops_invalid_entries() {
        let repaired = r#"[{"question":"q","answers":[]},{"answers":[]},{"question":"q2","answers":"nope"}]"#;
        let (records, dropped) = parse_records(repaired).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn parse_fails_when_nothing_survives() {
        let err = parse_records(r#"[{"answers":[]}]"#).unwrap_err();
        assert!(matches!(err, RepairError::NoValidEntries));
    }

    #[test]
    fn parse_error_carries_offset_and_context() {
        let broken = r#"[{"question": }]"#;
        let err = parse_records(broken).unwrap_err();
        match err {
            RepairError::Parse {
                offset, context, ..
            } => {
                assert!(offset <= broken.len());
                assert!(context.contains("question"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
