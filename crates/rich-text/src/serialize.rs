//! Value-to-markup serialization.
//!
//! Rebuilds the element tree from the per-slot format sets: adjacent slots
//! sharing a prefix of equal annotations continue the same elements, so
//! independently applied but identical spans merge into one canonical
//! wrapper. Prepare-only annotation kinds are skipped outside editable
//! mode. The output is canonical: serializing a reparsed output is
//! byte-identical.

use rich_text_markup::{to_html, Element, Node};

use crate::parse::PADDING_ATTR;
use crate::registry::FormatRegistry;
use crate::value::{
    FormatAnnotation, FormattedValue, Replacement, LINE_BREAK, OBJECT_REPLACEMENT,
};

/// Serialize a value to its markup string.
pub fn to_markup_string(value: &FormattedValue, registry: &FormatRegistry) -> String {
    to_html(&to_tree(value, registry, false))
}

/// Build the markup tree for a value.
///
/// In editable mode prepare-only annotations are kept, and a marked
/// padding `<br>` is appended when the text is empty or ends in a line
/// break so the caret stays reachable.
pub(crate) fn to_tree(value: &FormattedValue, registry: &FormatRegistry, editable: bool) -> Vec<Node> {
    let mut builder = TreeBuilder::default();
    let no_formats = Vec::new();

    for (slot, ch) in value.text.chars().enumerate() {
        let target: Vec<&FormatAnnotation> = value
            .formats
            .get(slot)
            .unwrap_or(&no_formats)
            .iter()
            .filter(|annotation| editable || !registry.is_prepare_only(&annotation.kind))
            .collect();
        builder.sync_open_elements(&target, registry);

        if let Some(replacement) = value.replacements.get(slot).and_then(Option::as_ref) {
            builder.append(Node::Element(replacement_element(replacement, registry)));
        } else if ch == LINE_BREAK {
            builder.append(Node::Element(Element::new("br")));
        } else if ch == OBJECT_REPLACEMENT {
            // Orphan placeholder slot without a replacement entry,
            // nothing to emit.
        } else {
            builder.append_char(ch);
        }
    }

    builder.sync_open_elements(&[], registry);
    let mut roots = builder.roots;

    if editable && (value.text.is_empty() || value.text.ends_with(LINE_BREAK)) {
        roots.push(Node::Element(
            Element::new("br").with_attr(PADDING_ATTR, "true"),
        ));
    }

    roots
}

// ── TreeBuilder ───────────────────────────────────────────────────────────

#[derive(Default)]
struct TreeBuilder {
    roots: Vec<Node>,
    open_elements: Vec<Element>,
    open_annotations: Vec<FormatAnnotation>,
}

impl TreeBuilder {
    /// Close and open wrapper elements so the open stack matches `target`.
    /// The shared prefix of equal annotations stays open, which is what
    /// merges adjacent identical spans.
    fn sync_open_elements(&mut self, target: &[&FormatAnnotation], registry: &FormatRegistry) {
        let shared = self
            .open_annotations
            .iter()
            .zip(target)
            .take_while(|(open, wanted)| *open == **wanted)
            .count();

        while self.open_annotations.len() > shared {
            self.open_annotations.pop();
            let element = self.open_elements.pop().expect("open stacks in sync");
            self.append(Node::Element(element));
        }

        for annotation in &target[shared..] {
            self.open_annotations.push((*annotation).clone());
            self.open_elements
                .push(annotation_element(annotation, registry));
        }
    }

    fn append(&mut self, node: Node) {
        let children = match self.open_elements.last_mut() {
            Some(open) => &mut open.children,
            None => &mut self.roots,
        };
        if let (Node::Text(data), Some(Node::Text(last))) = (&node, children.last_mut()) {
            last.push_str(data);
            return;
        }
        children.push(node);
    }

    fn append_char(&mut self, ch: char) {
        let children = match self.open_elements.last_mut() {
            Some(open) => &mut open.children,
            None => &mut self.roots,
        };
        if let Some(Node::Text(last)) = children.last_mut() {
            last.push(ch);
        } else {
            children.push(Node::Text(ch.to_string()));
        }
    }
}

// ── Element construction ──────────────────────────────────────────────────

fn annotation_element(annotation: &FormatAnnotation, registry: &FormatRegistry) -> Element {
    element_for(&annotation.kind, &annotation.attributes, registry)
}

fn replacement_element(replacement: &Replacement, registry: &FormatRegistry) -> Element {
    element_for(&replacement.kind, &replacement.attributes, registry)
}

/// Build the element for an annotation or replacement kind: captured
/// attributes first (their parse order), then the registered type's static
/// attributes and class token merged in without disturbing that order.
fn element_for(
    kind: &str,
    attributes: &rich_text_markup::Attrs,
    registry: &FormatRegistry,
) -> Element {
    let format_type = registry.by_name(kind);
    let tag = format_type
        .map(|t| t.tag_name.clone())
        .unwrap_or_else(|| kind.to_string());
    let mut element = Element::new(tag);
    element.attrs = attributes.clone();

    if let Some(format_type) = format_type {
        for (name, value) in &format_type.attributes {
            if !element.attrs.contains_key(name) {
                element.attrs.insert(name.clone(), value.clone());
            }
        }
        if let Some(class_name) = &format_type.class_name {
            let merged = match element.attrs.get("class") {
                Some(existing) => format!("{class_name} {existing}"),
                None => class_name.clone(),
            };
            element.attrs.insert("class".to_string(), merged);
        }
    }

    element
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_markup;
    use crate::registry::FormatType;
    use crate::value::ops::apply_format;

    fn registry() -> FormatRegistry {
        let mut registry = FormatRegistry::new();
        registry.register(FormatType::new("bold", "strong"));
        registry.register(FormatType::new("italic", "em"));
        registry.register(FormatType::new("link", "a"));
        registry.register(FormatType::new("image", "img").object());
        registry
    }

    #[test]
    fn plain_text_round_trip() {
        let registry = registry();
        let value = FormattedValue::from_plain_text("abc");
        assert_eq!(to_markup_string(&value, &registry), "abc");
    }

    #[test]
    fn bold_span_serializes_to_wrapper() {
        let registry = registry();
        let value = apply_format(
            &FormattedValue::from_plain_text("abc"),
            FormatAnnotation::new("bold"),
            1,
            3,
        );
        assert_eq!(to_markup_string(&value, &registry), "a<strong>bc</strong>");
    }

    #[test]
    fn adjacent_identical_spans_merge() {
        let registry = registry();
        let value = FormattedValue::from_plain_text("ab");
        let value = apply_format(&value, FormatAnnotation::new("bold"), 0, 1);
        let value = apply_format(&value, FormatAnnotation::new("bold"), 1, 2);
        assert_eq!(to_markup_string(&value, &registry), "<strong>ab</strong>");
    }

    #[test]
    fn differing_attributes_do_not_merge() {
        let registry = registry();
        let value = FormattedValue::from_plain_text("ab");
        let a = FormatAnnotation::new("link").with_attribute("href", "https://a.org");
        let b = FormatAnnotation::new("link").with_attribute("href", "https://b.org");
        let value = apply_format(&value, a, 0, 1);
        let value = apply_format(&value, b, 1, 2);
        assert_eq!(
            to_markup_string(&value, &registry),
            r#"<a href="https://a.org">a</a><a href="https://b.org">b</a>"#
        );
    }

    #[test]
    fn nesting_order_is_preserved() {
        let registry = registry();
        let html = "<em><strong>x</strong>y</em>";
        let value = parse_markup(html, &registry);
        assert_eq!(to_markup_string(&value, &registry), html);
    }

    #[test]
    fn replacement_serializes_as_void_element() {
        let registry = registry();
        let value = parse_markup(r#"a<img src="a.png">b"#, &registry);
        assert_eq!(
            to_markup_string(&value, &registry),
            r#"a<img src="a.png">b"#
        );
    }

    #[test]
    fn formatted_replacement_keeps_wrapper() {
        let registry = registry();
        let value = parse_markup(r#"<strong>a<img src="a.png"></strong>"#, &registry);
        assert_eq!(
            to_markup_string(&value, &registry),
            r#"<strong>a<img src="a.png"></strong>"#
        );
    }

    #[test]
    fn line_break_round_trip() {
        let registry = registry();
        let value = parse_markup("a<br>b", &registry);
        assert_eq!(to_markup_string(&value, &registry), "a<br>b");
    }

    #[test]
    fn prepare_only_kind_is_stripped() {
        let mut registry = registry();
        registry.register(
            FormatType::new("caret-marker", "span")
                .with_class("caret-marker")
                .prepare_only(),
        );
        let value = apply_format(
            &FormattedValue::from_plain_text("ab"),
            FormatAnnotation::new("caret-marker"),
            0,
            2,
        );
        assert_eq!(to_markup_string(&value, &registry), "ab");
    }

    #[test]
    fn class_type_reserializes_stably() {
        let mut registry = registry();
        registry.register(FormatType::new("mark", "span").with_class("note"));
        let html = r#"<span class="note loud">x</span>"#;
        let value = parse_markup(html, &registry);
        assert_eq!(to_markup_string(&value, &registry), html);
    }

    #[test]
    fn editable_tree_appends_padding_when_empty() {
        let registry = registry();
        let value = FormattedValue::default();
        let tree = to_tree(&value, &registry, true);
        assert_eq!(tree.len(), 1);
        let padding = tree[0].as_element().unwrap();
        assert_eq!(padding.tag, "br");
        assert!(padding.attrs.contains_key(PADDING_ATTR));
    }

    #[test]
    fn editable_tree_pads_trailing_line_break() {
        let registry = registry();
        let value = parse_markup("a<br>", &registry);
        let tree = to_tree(&value, &registry, true);
        // text "a", the break itself, then the padding marker.
        assert_eq!(tree.len(), 3);
    }
}
