//! Markup-to-value parsing.
//!
//! Walks a markup tree left to right, accumulating text, per-slot format
//! sets and replacements. The registry is the allow-list: elements that
//! match a registered format type wrap their content in an annotation (or
//! become a replacement slot for object types), `<br>` becomes a line
//! break, and everything else is stripped with its content kept.

use std::sync::OnceLock;

use regex::Regex;
use rich_text_markup::{Attrs, Node};

use crate::error::RichTextError;
use crate::registry::FormatRegistry;
use crate::value::{FormatAnnotation, FormatSet, FormattedValue, Replacement};

/// Marker attribute on the padding `<br>` the reconciler appends so an
/// empty editable keeps a visible caret. Never part of the value.
pub(crate) const PADDING_ATTR: &str = "data-rich-text-padding";

/// Attribute carrying the placeholder string on the editable root.
pub(crate) const PLACEHOLDER_ATTR: &str = "data-rich-text-placeholder";

/// Collapse runs of whitespace to a single space and trim the edges,
/// mirroring how the host markup language renders text.
pub fn collapse_white_space(input: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let re = WHITESPACE.get_or_init(|| Regex::new(r"[ \t\r\n]+").unwrap());
    re.replace_all(input, " ").trim_matches(' ').to_string()
}

/// Parse a markup string into a value, dropping recovery reports.
pub fn parse_markup(html: &str, registry: &FormatRegistry) -> FormattedValue {
    parse_markup_with_report(html, registry, &mut |_| {})
}

/// Parse a markup string into a value, reporting recovered constructs
/// (stripped unknown elements) to `report`.
pub fn parse_markup_with_report(
    html: &str,
    registry: &FormatRegistry,
    report: &mut dyn FnMut(RichTextError),
) -> FormattedValue {
    let nodes = rich_text_markup::parse(html);
    let mut builder = ValueBuilder::new();
    let mut stack = Vec::new();
    walk_nodes(&nodes, registry, &mut stack, &mut builder, report);
    builder.finish()
}

fn walk_nodes(
    nodes: &[Node],
    registry: &FormatRegistry,
    stack: &mut Vec<FormatAnnotation>,
    builder: &mut ValueBuilder,
    report: &mut dyn FnMut(RichTextError),
) {
    for node in nodes {
        match node {
            Node::Text(data) => builder.push_str(data, stack),
            Node::Element(el) => match classify_element(&el.tag, &el.attrs, registry) {
                ElementAction::Skip => {}
                ElementAction::LineBreak => builder.push_line_break(stack),
                ElementAction::Replacement(replacement) => {
                    builder.push_replacement(replacement, stack)
                }
                ElementAction::Format(annotation) => {
                    stack.push(annotation);
                    walk_nodes(&el.children, registry, stack, builder, report);
                    stack.pop();
                }
                ElementAction::Unwrap => {
                    walk_nodes(&el.children, registry, stack, builder, report);
                }
                ElementAction::Strip => {
                    report(RichTextError::MalformedMarkup {
                        tag: el.tag.clone(),
                    });
                    walk_nodes(&el.children, registry, stack, builder, report);
                }
            },
        }
    }
}

// ── Element classification ────────────────────────────────────────────────

/// What one element contributes to the value.
pub(crate) enum ElementAction {
    /// Wrap the element's content in an annotation.
    Format(FormatAnnotation),
    /// Occupy one replacement slot; children are ignored.
    Replacement(Replacement),
    /// Contribute a line-break character.
    LineBreak,
    /// Drop the wrapper, keep the content.
    Strip,
    /// Drop the wrapper silently: a prepare-only decoration the reconciler
    /// wrote into the view; the value never carries it.
    Unwrap,
    /// Contribute nothing at all (editable-view artifacts).
    Skip,
}

pub(crate) fn classify_element(
    tag: &str,
    attrs: &Attrs,
    registry: &FormatRegistry,
) -> ElementAction {
    if attrs.contains_key(PADDING_ATTR) {
        return ElementAction::Skip;
    }
    if tag == "br" {
        return ElementAction::LineBreak;
    }
    match registry.match_element(tag, attrs) {
        Some(format_type) if format_type.prepare_only => ElementAction::Unwrap,
        Some(format_type) if format_type.object => {
            let mut replacement = Replacement::new(format_type.name.clone());
            replacement.attributes = capture_attrs(attrs, format_type.class_name.as_deref());
            ElementAction::Replacement(replacement)
        }
        Some(format_type) => {
            let mut annotation = FormatAnnotation::new(format_type.name.clone());
            annotation.attributes = capture_attrs(attrs, format_type.class_name.as_deref());
            ElementAction::Format(annotation)
        }
        None => ElementAction::Strip,
    }
}

/// Capture element attributes in document order, removing the class token
/// that matched the registered type (the serializer re-adds it).
fn capture_attrs(attrs: &Attrs, matched_class: Option<&str>) -> Attrs {
    let mut captured = Attrs::new();
    for (name, value) in attrs {
        if name == "class" {
            if let Some(token) = matched_class {
                let remaining: Vec<&str> = value
                    .split_ascii_whitespace()
                    .filter(|candidate| *candidate != token)
                    .collect();
                if !remaining.is_empty() {
                    captured.insert(name.clone(), remaining.join(" "));
                }
                continue;
            }
        }
        captured.insert(name.clone(), value.clone());
    }
    captured
}

// ── ValueBuilder ──────────────────────────────────────────────────────────

/// Left-to-right accumulator for text, formats and replacements. Shared by
/// the markup parser and the view extractor.
pub(crate) struct ValueBuilder {
    text: String,
    formats: Vec<FormatSet>,
    replacements: Vec<Option<Replacement>>,
}

impl ValueBuilder {
    pub(crate) fn new() -> Self {
        Self {
            text: String::new(),
            formats: Vec::new(),
            replacements: Vec::new(),
        }
    }

    /// Number of slots accumulated so far.
    pub(crate) fn len(&self) -> usize {
        self.formats.len()
    }

    pub(crate) fn push_str(&mut self, data: &str, stack: &[FormatAnnotation]) {
        for ch in data.chars() {
            self.text.push(ch);
            self.formats.push(stack.to_vec());
            self.replacements.push(None);
        }
    }

    pub(crate) fn push_line_break(&mut self, stack: &[FormatAnnotation]) {
        self.text.push(crate::value::LINE_BREAK);
        self.formats.push(stack.to_vec());
        self.replacements.push(None);
    }

    pub(crate) fn push_replacement(
        &mut self,
        replacement: Replacement,
        stack: &[FormatAnnotation],
    ) {
        self.text.push(crate::value::OBJECT_REPLACEMENT);
        self.formats.push(stack.to_vec());
        self.replacements.push(Some(replacement));
    }

    pub(crate) fn finish(self) -> FormattedValue {
        FormattedValue {
            text: self.text,
            formats: self.formats,
            replacements: self.replacements,
            start: None,
            end: None,
            active_formats: None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FormatType;
    use crate::value::OBJECT_REPLACEMENT;

    fn registry() -> FormatRegistry {
        let mut registry = FormatRegistry::new();
        registry.register(FormatType::new("bold", "strong"));
        registry.register(FormatType::new("italic", "em"));
        registry.register(FormatType::new("link", "a"));
        registry.register(FormatType::new("image", "img").object());
        registry
    }

    #[test]
    fn collapse_white_space_squashes_runs() {
        assert_eq!(collapse_white_space("a\n\t  b"), "a b");
        assert_eq!(collapse_white_space("  a b \n"), "a b");
        assert_eq!(collapse_white_space(""), "");
    }

    #[test]
    fn plain_text_parses_to_unformatted_slots() {
        let value = parse_markup("abc", &registry());
        assert_eq!(value.text, "abc");
        assert!(value.formats.iter().all(|set| set.is_empty()));
    }

    #[test]
    fn bold_run_annotates_exact_slots() {
        let value = parse_markup("<strong>ab</strong>c", &registry());
        assert_eq!(value.text, "abc");
        assert_eq!(value.formats[0], vec![FormatAnnotation::new("bold")]);
        assert_eq!(value.formats[1], vec![FormatAnnotation::new("bold")]);
        assert!(value.formats[2].is_empty());
    }

    #[test]
    fn nested_formats_keep_outer_to_inner_order() {
        let value = parse_markup("<em><strong>x</strong></em>", &registry());
        assert_eq!(
            value.formats[0],
            vec![FormatAnnotation::new("italic"), FormatAnnotation::new("bold")]
        );
    }

    #[test]
    fn link_attributes_captured_in_order() {
        let value = parse_markup(r#"<a href="https://w.org" rel="home">w</a>"#, &registry());
        let link = &value.formats[0][0];
        assert_eq!(link.kind, "link");
        let keys: Vec<_> = link.attributes.keys().cloned().collect();
        assert_eq!(keys, vec!["href", "rel"]);
    }

    #[test]
    fn object_element_becomes_replacement_slot() {
        let value = parse_markup(r#"a<img src="a.png">b"#, &registry());
        assert_eq!(value.text, format!("a{OBJECT_REPLACEMENT}b"));
        let replacement = value.replacements[1].as_ref().unwrap();
        assert_eq!(replacement.kind, "image");
        assert_eq!(replacement.attributes.get("src").unwrap(), "a.png");
    }

    #[test]
    fn br_becomes_line_break() {
        let value = parse_markup("a<br>b", &registry());
        assert_eq!(value.text, "a\nb");
        assert!(value.replacements[1].is_none());
    }

    #[test]
    fn unknown_element_is_stripped_and_reported() {
        let mut stripped = Vec::new();
        let value = parse_markup_with_report("<div>a<u>b</u></div>", &registry(), &mut |err| {
            if let RichTextError::MalformedMarkup { tag } = err {
                stripped.push(tag);
            }
        });
        assert_eq!(value.text, "ab");
        assert!(value.formats.iter().all(|set| set.is_empty()));
        assert_eq!(stripped, vec!["div", "u"]);
    }

    #[test]
    fn class_matched_type_drops_matched_token() {
        let mut registry = registry();
        registry.register(FormatType::new("mark", "span").with_class("note"));
        let value = parse_markup(r#"<span class="note loud">x</span>"#, &registry);
        let mark = &value.formats[0][0];
        assert_eq!(mark.kind, "mark");
        assert_eq!(mark.attributes.get("class").unwrap(), "loud");
    }

    #[test]
    fn padding_artifact_is_skipped() {
        let value = parse_markup(r#"ab<br data-rich-text-padding="true">"#, &registry());
        assert_eq!(value.text, "ab");
    }
}
