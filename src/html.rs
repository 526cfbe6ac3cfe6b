//! HTML cleanup for scraped post bodies.
//!
//! Scraped question/answer HTML arrives full of site chrome: notice banners,
//! styling attributes, wrapper elements. Cleaning reduces every fragment to
//! the three tags that carry content structure (`p`, `code`, `a`), keeping
//! only `href` on anchors.

use ego_tree::NodeRef;
use scraper::node::{Element, Node};
use scraper::Html;

/// Class marking scrape-site boilerplate banners; removed with their subtree.
const NOTICE_CLASS: &str = "js-post-notice";

/// Tags retained in cleaned fragments. Everything else is unwrapped.
const ALLOWED_TAGS: &[&str] = &["p", "code", "a"];

/// Clean an HTML fragment down to the allowed tag subset.
///
/// Idempotent: cleaning already-clean output is a no-op.
pub fn clean(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());
    render(fragment.tree.root(), &mut out);
    collapse_whitespace(&out)
}

/// Canonical comparison form of a fragment: tags stripped, whitespace
/// collapsed, lower-cased. This is the dedup hash input.
pub fn canonical_text(html: &str) -> String {
    let fragment = Html::parse_fragment(&clean(html));
    let mut out = String::new();
    collect_text(fragment.tree.root(), &mut out);
    collapse_whitespace(&out).to_lowercase()
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => push_escaped(text, out),
        Node::Element(el) => {
            if has_notice_class(el) {
                return;
            }
            let name = el.name();
            if !ALLOWED_TAGS.contains(&name) {
                for child in node.children() {
                    render(child, out);
                }
                return;
            }
            out.push('<');
            out.push_str(name);
            if name == "a" {
                if let Some(href) = el.attr("href") {
                    out.push_str(" href=\"");
                    push_attr_escaped(href, out);
                    out.push('"');
                }
            }
            out.push('>');
            for child in node.children() {
                render(child, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        _ => {
            for child in node.children() {
                render(child, out);
            }
        }
    }
}

fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(text),
        _ => {
            for child in node.children() {
                collect_text(child, out);
            }
        }
    }
}

fn has_notice_class(el: &Element) -> bool {
    el.attr("class")
        .is_some_and(|classes| classes.split_whitespace().any(|c| c == NOTICE_CLASS))
}

fn push_escaped(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn push_attr_escaped(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_attributes_and_unwraps() {
        let html = r#"<div class="post-body"><p style="color:red">Hello <b>world</b></p></div>"#;
        assert_eq!(clean(html), "<p>Hello world</p>");
    }

    #[test]
    fn removes_notice_subtree() {
        let html = r#"<p>keep</p><div class="s-notice js-post-notice"><p>boilerplate</p></div>"#;
        assert_eq!(clean(html), "<p>keep</p>");
    }

    #[test]
    fn anchor_keeps_only_href() {
        let html = r#"<a href="https://example.com/q" rel="nofollow" class="s-link">link</a>"#;
        assert_eq!(clean(html), r#"<a href="https://example.com/q">link</a>"#);
    }

    #[test]
    fn anchor_without_href() {
        assert_eq!(clean("<a name=\"top\">here</a>"), "<a>here</a>");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(clean("<p>a \n\n  b</p>   <p>c</p>"), "<p>a b</p> <p>c</p>");
    }

    #[test]
    fn idempotent() {
        let html = r#"<div><p class="x">A <code>b()</code> &amp; <a href="u?a=1&b=2">c</a></p><span>d</span></div>"#;
        let once = clean(html);
        assert_eq!(clean(&once), once);
    }

    #[test]
    fn no_disallowed_tags_in_output() {
        let html = "<article><h1>t</h1><pre><code>x</code></pre><ul><li>i</li></ul></article>";
        let cleaned = clean(html);
        for tag in ["article", "h1", "pre", "ul", "li", "span", "div"] {
            assert!(!cleaned.contains(&format!("<{tag}")), "found <{tag} in {cleaned}");
        }
        assert!(cleaned.contains("<code>x</code>"));
    }

    #[test]
    fn canonical_lowercases_and_strips_tags() {
        let a = canonical_text("<p>What   IS <code>X</code>?</p>");
        assert_eq!(a, "what is x?");
    }

    #[test]
    fn canonical_ignores_formatting_noise() {
        let a = canonical_text(r#"<p class="q">What is X?</p>"#);
        let b = canonical_text("<div><p>What  is\n X?</p></div>");
        assert_eq!(a, b);
    }

    #[test]
    fn empty_input() {
        assert_eq!(clean(""), "");
        assert_eq!(canonical_text(""), "");
    }
}
