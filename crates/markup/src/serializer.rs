//! Canonical HTML serializer for markup trees.
//!
//! Emits exactly one form per tree: attributes in insertion order, double
//! quotes, void elements without a close tag or self-closing slash. Parsing
//! the output and serializing again yields byte-identical markup.

use crate::entities::{escape_attribute, escape_text};
use crate::node::{Element, Node};

/// Serialize a list of sibling nodes.
pub fn to_html(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

/// Serialize a single node.
pub fn to_html_node(node: &Node) -> String {
    let mut out = String::new();
    write_node(&mut out, node);
    out
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Text(data) => out.push_str(&escape_text(data)),
        Node::Element(el) => write_element(out, el),
    }
}

fn write_element(out: &mut String, el: &Element) {
    out.push('<');
    out.push_str(&el.tag);
    for (name, value) in &el.attrs {
        out.push(' ');
        out.push_str(name);
        if !value.is_empty() {
            out.push_str("=\"");
            out.push_str(&escape_attribute(value));
            out.push('"');
        }
    }
    out.push('>');

    if el.is_void() {
        return;
    }

    for child in &el.children {
        write_node(out, child);
    }
    out.push_str("</");
    out.push_str(&el.tag);
    out.push('>');
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Element;
    use crate::parser::parse;

    #[test]
    fn text_is_escaped() {
        assert_eq!(to_html(&[Node::text("a < b & c")]), "a &lt; b &amp; c");
    }

    #[test]
    fn element_with_children() {
        let node = Node::Element(
            Element::new("strong").with_children(vec![Node::text("ab")]),
        );
        assert_eq!(to_html_node(&node), "<strong>ab</strong>");
    }

    #[test]
    fn void_element_has_no_close_tag() {
        assert_eq!(to_html_node(&Node::Element(Element::new("br"))), "<br>");
    }

    #[test]
    fn attributes_serialized_in_order() {
        let node = Node::Element(
            Element::new("a")
                .with_attr("href", "https://w.org")
                .with_attr("target", "_blank")
                .with_children(vec![Node::text("w")]),
        );
        assert_eq!(
            to_html_node(&node),
            r#"<a href="https://w.org" target="_blank">w</a>"#
        );
    }

    #[test]
    fn valueless_attribute_serialized_bare() {
        let node = Node::Element(Element::new("input").with_attr("disabled", ""));
        assert_eq!(to_html_node(&node), "<input disabled>");
    }

    #[test]
    fn attribute_values_escaped() {
        let node = Node::Element(Element::new("img").with_attr("alt", "a \"b\" & c"));
        assert_eq!(to_html_node(&node), r#"<img alt="a &quot;b&quot; &amp; c">"#);
    }

    #[test]
    fn parse_serialize_is_idempotent() {
        let cases = [
            "plain",
            "<strong>ab</strong>c",
            "a<br>b",
            r#"<a href="https://w.org">link</a>"#,
            "<em><strong>x</strong>y</em>",
            "a &amp; b",
            "nb\u{00A0}sp",
        ];
        for case in cases {
            let once = to_html(&parse(case));
            let twice = to_html(&parse(&once));
            assert_eq!(once, twice, "case: {case}");
        }
    }
}
