//! Two-channel span extraction: code vs. prose.

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::Html;

use crate::html::collapse_whitespace;

/// Partition a cleaned fragment into code spans and text spans.
///
/// Every `code` element becomes one code span and is excluded from text
/// extraction; remaining `p` and `a` elements yield text spans in document
/// order. Spans that are empty after trimming are dropped.
pub fn split(html: &str) -> (Vec<String>, Vec<String>) {
    let fragment = Html::parse_fragment(html);
    let mut code_spans = Vec::new();
    let mut text_spans = Vec::new();

    for node in fragment.tree.root().descendants() {
        let Node::Element(el) = node.value() else {
            continue;
        };
        match el.name() {
            "code" => {
                if inside_code(node) {
                    continue;
                }
                let span = element_text(node, false);
                if !span.is_empty() {
                    code_spans.push(span);
                }
            }
            "p" | "a" => {
                if inside_code(node) {
                    continue;
                }
                let span = element_text(node, true);
                if !span.is_empty() {
                    text_spans.push(span);
                }
            }
            _ => {}
        }
    }

    (code_spans, text_spans)
}

fn element_text(node: NodeRef<'_, Node>, exclude_code: bool) -> String {
    let mut out = String::new();
    gather(node, exclude_code, &mut out);
    collapse_whitespace(&out)
}

fn gather(node: NodeRef<'_, Node>, exclude_code: bool, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                if exclude_code && el.name() == "code" {
                    continue;
                }
                gather(child, exclude_code, out);
            }
            _ => gather(child, exclude_code, out),
        }
    }
}

fn inside_code(node: NodeRef<'_, Node>) -> bool {
    node.ancestors()
        .any(|a| matches!(a.value(), Node::Element(el) if el.name() == "code"))
}
