//! Reconciliation between a [`FormattedValue`] and an [`EditableView`].
//!
//! `apply_to_view` patches the live tree to match a value with minimal
//! mutation: nodes already equal to their target are left untouched, text
//! runs are updated in place, wrappers are replaced only on tag mismatch,
//! and trailing extras are removed. The live selection is restored from
//! the value only when the view is focused.
//!
//! `extract_from_view` is the read path after a raw input event: the live
//! tree is the source of truth for what the user typed, so the value is
//! rebuilt from it, resolving the view's selection range to character
//! offsets.

use rich_text_markup::{Attrs, Node};

use crate::error::RichTextError;
use crate::parse::{classify_element, ElementAction, ValueBuilder, PADDING_ATTR, PLACEHOLDER_ATTR};
use crate::registry::FormatRegistry;
use crate::serialize::to_tree;
use crate::value::{FormatAnnotation, FormattedValue};
use crate::view::{EditableView, NodeId, ViewPosition, ViewRange};

/// Options for one apply pass.
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Placeholder string surfaced on the root while the value is empty.
    pub placeholder: Option<String>,
}

// ── Apply ─────────────────────────────────────────────────────────────────

/// Patch `view` to match `value`, returning recovered faults (failing
/// prepare hooks).
pub fn apply_to_view(
    value: &FormattedValue,
    view: &mut EditableView,
    registry: &FormatRegistry,
    options: &ApplyOptions,
) -> Vec<RichTextError> {
    let mut errors = Vec::new();

    let mut decorated = value.clone();
    registry.run_prepare_editable_tree(&mut decorated, &mut |err| errors.push(err));

    let target = to_tree(&decorated, registry, true);
    update_children(view, view.root(), &target);

    match (&options.placeholder, value.text.is_empty()) {
        (Some(placeholder), true) => {
            view.set_attribute(view.root(), PLACEHOLDER_ATTR, placeholder.clone());
        }
        _ => view.remove_attribute(view.root(), PLACEHOLDER_ATTR),
    }

    // Only a focused view gets its selection moved; an unfocused one must
    // not be forced (the host may have focus elsewhere).
    if view.focused() {
        if let Some(start) = value.start {
            let end = value.end.unwrap_or(start);
            let anchor = position_at_offset(view, registry, start);
            let focus = position_at_offset(view, registry, end);
            view.set_selection(Some(ViewRange { anchor, focus }));
        }
    }

    errors
}

/// Make `parent`'s children match `target`, touching as little as
/// possible.
fn update_children(view: &mut EditableView, parent: NodeId, target: &[Node]) {
    let mut index = 0;
    for target_node in target {
        match view.children(parent).get(index).copied() {
            None => {
                let id = view.build_subtree(target_node);
                view.append_child(parent, id);
            }
            Some(current) if view.node_matches(current, target_node) => {}
            Some(current) => match target_node {
                Node::Text(expected) => {
                    if view.is_text(current) {
                        view.set_text_data(current, expected.clone());
                    } else {
                        let id = view.build_subtree(target_node);
                        view.replace_child_at(parent, index, id);
                    }
                }
                Node::Element(expected) => {
                    if view.tag(current) == Some(expected.tag.as_str()) {
                        patch_attributes(view, current, &expected.attrs);
                        update_children(view, current, &expected.children);
                    } else {
                        let id = view.build_subtree(target_node);
                        view.replace_child_at(parent, index, id);
                    }
                }
            },
        }
        index += 1;
    }

    while view.children(parent).len() > index {
        let last = view.children(parent).len() - 1;
        view.remove_child_at(parent, last);
    }
}

fn patch_attributes(view: &mut EditableView, id: NodeId, target: &Attrs) {
    let current_names: Vec<String> = view
        .attrs(id)
        .map(|attrs| attrs.keys().cloned().collect())
        .unwrap_or_default();
    for name in current_names {
        if !target.contains_key(&name) {
            view.remove_attribute(id, &name);
        }
    }
    for (name, value) in target {
        if view.attrs(id).and_then(|attrs| attrs.get(name)) != Some(value) {
            view.set_attribute(id, name.clone(), value.clone());
        }
    }
}

// ── Offset to position mapping ────────────────────────────────────────────

/// Resolve a character offset to a live position: inside a text node when
/// possible, otherwise a child index around an atomic node.
fn position_at_offset(view: &EditableView, registry: &FormatRegistry, offset: usize) -> ViewPosition {
    match descend(view, view.root(), registry, offset) {
        Ok(position) => position,
        Err(_) => end_position(view),
    }
}

fn descend(
    view: &EditableView,
    parent: NodeId,
    registry: &FormatRegistry,
    mut remaining: usize,
) -> Result<ViewPosition, usize> {
    let children: Vec<NodeId> = view.children(parent).to_vec();
    for (index, child) in children.iter().copied().enumerate() {
        if let Some(data) = view.text_data(child) {
            let len = data.chars().count();
            if remaining <= len {
                return Ok(ViewPosition {
                    node: child,
                    offset: remaining,
                });
            }
            remaining -= len;
            continue;
        }

        let tag = view.tag(child).unwrap_or_default().to_string();
        let attrs = view.attrs(child).cloned().unwrap_or_default();
        match classify_element(&tag, &attrs, registry) {
            ElementAction::Skip => {
                if remaining == 0 {
                    return Ok(ViewPosition {
                        node: parent,
                        offset: index,
                    });
                }
            }
            ElementAction::LineBreak | ElementAction::Replacement(_) => {
                if remaining == 0 {
                    return Ok(ViewPosition {
                        node: parent,
                        offset: index,
                    });
                }
                remaining -= 1;
            }
            ElementAction::Format(_) | ElementAction::Strip | ElementAction::Unwrap => {
                match descend(view, child, registry, remaining) {
                    Ok(position) => return Ok(position),
                    Err(rest) => remaining = rest,
                }
            }
        }
    }
    Err(remaining)
}

/// Position after the last content child of the root, before any padding.
fn end_position(view: &EditableView) -> ViewPosition {
    let children = view.children(view.root());
    let mut end = children.len();
    while end > 0 {
        let child = children[end - 1];
        let is_padding = view
            .attrs(child)
            .map(|attrs| attrs.contains_key(PADDING_ATTR))
            .unwrap_or(false);
        if is_padding {
            end -= 1;
        } else {
            break;
        }
    }
    ViewPosition {
        node: view.root(),
        offset: end,
    }
}

// ── Extract ───────────────────────────────────────────────────────────────

/// Read the live tree and selection back into a fresh value.
pub fn extract_from_view(view: &EditableView, registry: &FormatRegistry) -> FormattedValue {
    let mut builder = ValueBuilder::new();
    let mut stack: Vec<FormatAnnotation> = Vec::new();
    let mut tracker = SelectionTracker::new(view.selection());

    walk_view(view, view.root(), registry, &mut stack, &mut builder, &mut tracker);

    let total = builder.len();
    let mut value = builder.finish();
    if let Some((anchor, focus)) = tracker.finish(total) {
        value.start = Some(anchor.min(focus));
        value.end = Some(anchor.max(focus));
    }
    value
}

fn walk_view(
    view: &EditableView,
    parent: NodeId,
    registry: &FormatRegistry,
    stack: &mut Vec<FormatAnnotation>,
    builder: &mut ValueBuilder,
    tracker: &mut SelectionTracker,
) {
    let children: Vec<NodeId> = view.children(parent).to_vec();
    for (index, child) in children.iter().copied().enumerate() {
        tracker.visit_element_boundary(parent, index, builder.len());

        if let Some(data) = view.text_data(child) {
            tracker.visit_text(child, data, builder.len());
            builder.push_str(data, stack);
            continue;
        }

        let tag = view.tag(child).unwrap_or_default().to_string();
        let attrs = view.attrs(child).cloned().unwrap_or_default();
        match classify_element(&tag, &attrs, registry) {
            ElementAction::Skip => {}
            ElementAction::LineBreak => builder.push_line_break(stack),
            ElementAction::Replacement(replacement) => {
                builder.push_replacement(replacement, stack)
            }
            ElementAction::Format(annotation) => {
                stack.push(annotation);
                walk_view(view, child, registry, stack, builder, tracker);
                stack.pop();
            }
            ElementAction::Strip | ElementAction::Unwrap => {
                walk_view(view, child, registry, stack, builder, tracker);
            }
        }
    }
    tracker.visit_element_boundary(parent, children.len(), builder.len());
}

/// Resolves the view's anchor/focus positions to character offsets while
/// the extraction walk passes them.
struct SelectionTracker {
    range: Option<ViewRange>,
    anchor: Option<usize>,
    focus: Option<usize>,
}

impl SelectionTracker {
    fn new(range: Option<ViewRange>) -> Self {
        Self {
            range,
            anchor: None,
            focus: None,
        }
    }

    fn visit_text(&mut self, node: NodeId, data: &str, offset_before: usize) {
        let Some(range) = self.range else { return };
        let len = data.chars().count();
        if self.anchor.is_none() && range.anchor.node == node {
            self.anchor = Some(offset_before + range.anchor.offset.min(len));
        }
        if self.focus.is_none() && range.focus.node == node {
            self.focus = Some(offset_before + range.focus.offset.min(len));
        }
    }

    fn visit_element_boundary(&mut self, parent: NodeId, index: usize, offset: usize) {
        let Some(range) = self.range else { return };
        if self.anchor.is_none() && range.anchor.node == parent && range.anchor.offset == index {
            self.anchor = Some(offset);
        }
        if self.focus.is_none() && range.focus.node == parent && range.focus.offset == index {
            self.focus = Some(offset);
        }
    }

    /// Final offsets; endpoints the walk never passed clamp to the end.
    fn finish(self, total: usize) -> Option<(usize, usize)> {
        self.range?;
        Some((self.anchor.unwrap_or(total), self.focus.unwrap_or(total)))
    }
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

    fn apply(value: &FormattedValue, view: &mut EditableView, registry: &FormatRegistry) {
        let errors = apply_to_view(value, view, registry, &ApplyOptions::default());
        assert!(errors.is_empty());
    }

    #[test]
    fn renders_value_into_empty_view() {
        let registry = registry();
        let value = parse_markup("a<strong>b</strong>", &registry);
        let mut view = EditableView::new();
        apply(&value, &mut view, &registry);
        assert_eq!(view.inner_html(), "a<strong>b</strong>");
    }

    #[test]
    fn reapplying_same_value_keeps_nodes() {
        let registry = registry();
        let value = parse_markup("a<strong>b</strong>", &registry);
        let mut view = EditableView::new();
        apply(&value, &mut view, &registry);
        let before: Vec<NodeId> = view.children(view.root()).to_vec();
        apply(&value, &mut view, &registry);
        assert_eq!(view.children(view.root()), &before[..]);
    }

    #[test]
    fn text_edit_patches_data_in_place() {
        let registry = registry();
        let mut view = EditableView::new();
        apply(&parse_markup("abc", &registry), &mut view, &registry);
        let text_node = view.children(view.root())[0];

        apply(&parse_markup("abxc", &registry), &mut view, &registry);
        assert_eq!(view.children(view.root())[0], text_node);
        assert_eq!(view.text_data(text_node).unwrap(), "abxc");
    }

    #[test]
    fn tag_change_replaces_wrapper() {
        let registry = registry();
        let mut view = EditableView::new();
        apply(&parse_markup("<strong>x</strong>", &registry), &mut view, &registry);
        apply(&parse_markup("<em>x</em>", &registry), &mut view, &registry);
        assert_eq!(view.inner_html(), "<em>x</em>");
    }

    #[test]
    fn trailing_children_removed() {
        let registry = registry();
        let mut view = EditableView::new();
        apply(&parse_markup("a<br>b", &registry), &mut view, &registry);
        apply(&parse_markup("a", &registry), &mut view, &registry);
        assert_eq!(view.inner_html(), "a");
    }

    #[test]
    fn empty_value_renders_padding() {
        let registry = registry();
        let mut view = EditableView::new();
        apply(&FormattedValue::default(), &mut view, &registry);
        assert_eq!(view.inner_html(), r#"<br data-rich-text-padding="true">"#);
    }

    #[test]
    fn placeholder_attribute_follows_emptiness() {
        let registry = registry();
        let options = ApplyOptions {
            placeholder: Some("Write something".to_string()),
        };
        let mut view = EditableView::new();

        apply_to_view(&FormattedValue::default(), &mut view, &registry, &options);
        assert_eq!(
            view.attrs(view.root()).unwrap().get(PLACEHOLDER_ATTR).unwrap(),
            "Write something"
        );

        apply_to_view(&parse_markup("a", &registry), &mut view, &registry, &options);
        assert!(!view.attrs(view.root()).unwrap().contains_key(PLACEHOLDER_ATTR));
    }

    #[test]
    fn selection_restored_only_when_focused() {
        let registry = registry();
        let value = parse_markup("abc", &registry).with_selection(Some(1), Some(2));

        let mut unfocused = EditableView::new();
        apply(&value, &mut unfocused, &registry);
        assert_eq!(unfocused.selection(), None);

        let mut focused = EditableView::new();
        focused.set_focused(true);
        apply(&value, &mut focused, &registry);
        let range = focused.selection().unwrap();
        let text_node = focused.children(focused.root())[0];
        assert_eq!(range.anchor, ViewPosition { node: text_node, offset: 1 });
        assert_eq!(range.focus, ViewPosition { node: text_node, offset: 2 });
    }

    #[test]
    fn caret_in_empty_view_sits_before_padding() {
        let registry = registry();
        let mut view = EditableView::new();
        view.set_focused(true);
        let value = FormattedValue::default().with_selection(Some(0), Some(0));
        apply(&value, &mut view, &registry);
        let range = view.selection().unwrap();
        assert_eq!(range.anchor, ViewPosition { node: view.root(), offset: 0 });
    }

    #[test]
    fn caret_at_line_break_boundary() {
        let registry = registry();
        let mut view = EditableView::new();
        view.set_focused(true);

        // Offset 1 lands at the end of the leading text node.
        let value = parse_markup("a<br>b", &registry).with_selection(Some(1), Some(1));
        apply(&value, &mut view, &registry);
        let text_a = view.children(view.root())[0];
        let range = view.selection().unwrap();
        assert_eq!(range.anchor, ViewPosition { node: text_a, offset: 1 });

        // A leading <br> has no text before it, so the caret is the child
        // index in the root.
        let value = parse_markup("<br>b", &registry).with_selection(Some(0), Some(0));
        apply(&value, &mut view, &registry);
        let range = view.selection().unwrap();
        assert_eq!(range.anchor, ViewPosition { node: view.root(), offset: 0 });
    }

    // ── Extraction ────────────────────────────────────────────────────────

    #[test]
    fn extract_inverts_apply() {
        let registry = registry();
        let cases = [
            "plain",
            "a<strong>b</strong>c",
            "<em><strong>x</strong>y</em>",
            r#"a<img src="a.png">b"#,
            "a<br>b",
        ];
        for case in cases {
            let value = parse_markup(case, &registry);
            let mut view = EditableView::new();
            apply(&value, &mut view, &registry);
            let extracted = extract_from_view(&view, &registry);
            assert!(extracted.equals(&value), "case: {case}");
        }
    }

    #[test]
    fn extract_resolves_text_selection() {
        let registry = registry();
        let mut view = EditableView::new();
        apply(&parse_markup("a<strong>bc</strong>", &registry), &mut view, &registry);
        let strong = view.children(view.root())[1];
        let inner_text = view.children(strong)[0];
        view.set_selection(Some(ViewRange {
            anchor: ViewPosition { node: inner_text, offset: 0 },
            focus: ViewPosition { node: inner_text, offset: 2 },
        }));

        let extracted = extract_from_view(&view, &registry);
        assert_eq!(extracted.start, Some(1));
        assert_eq!(extracted.end, Some(3));
    }

    #[test]
    fn extract_orders_backward_selection() {
        let registry = registry();
        let mut view = EditableView::new();
        apply(&parse_markup("abc", &registry), &mut view, &registry);
        let text_node = view.children(view.root())[0];
        view.set_selection(Some(ViewRange {
            anchor: ViewPosition { node: text_node, offset: 2 },
            focus: ViewPosition { node: text_node, offset: 0 },
        }));

        let extracted = extract_from_view(&view, &registry);
        assert_eq!(extracted.start, Some(0));
        assert_eq!(extracted.end, Some(2));
    }

    #[test]
    fn extract_resolves_element_anchored_caret() {
        let registry = registry();
        let mut view = EditableView::new();
        apply(&parse_markup("a<br>b", &registry), &mut view, &registry);
        view.set_selection(Some(ViewRange::caret(ViewPosition {
            node: view.root(),
            offset: 2,
        })));

        let extracted = extract_from_view(&view, &registry);
        assert_eq!(extracted.start, Some(2));
        assert_eq!(extracted.end, Some(2));
    }

    #[test]
    fn extract_ignores_padding_and_placeholder() {
        let registry = registry();
        let options = ApplyOptions {
            placeholder: Some("Type here".to_string()),
        };
        let mut view = EditableView::new();
        apply_to_view(&FormattedValue::default(), &mut view, &registry, &options);

        let extracted = extract_from_view(&view, &registry);
        assert!(extracted.text.is_empty());
        assert!(extracted.is_empty());
    }

    #[test]
    fn extract_after_typing_in_formatted_run() {
        let registry = registry();
        let mut view = EditableView::new();
        view.set_focused(true);
        let value = parse_markup("<strong>ab</strong>", &registry).with_selection(Some(1), Some(1));
        apply(&value, &mut view, &registry);

        view.insert_text_at_caret("X");
        let extracted = extract_from_view(&view, &registry);
        assert_eq!(extracted.text, "aXb");
        assert_eq!(extracted.formats[1], vec![FormatAnnotation::new("bold")]);
        assert_eq!(extracted.start, Some(2));
        assert_eq!(extracted.end, Some(2));
    }
}
