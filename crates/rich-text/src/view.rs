//! EditableView — the live, externally-owned document tree.
//!
//! An arena of element and text nodes plus the live selection and focus
//! state. The hosting environment owns the view's lifetime and feeds user
//! input into it; during an editing session its content is managed
//! exclusively by the reconciler. Positions follow document-range
//! semantics: a character offset inside a text node, a child index inside
//! an element.

use rich_text_markup::{to_html, Attrs, Element, Node};

/// Handle to a node in the view arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum ViewNodeKind {
    Element {
        tag: String,
        attrs: Attrs,
        children: Vec<NodeId>,
    },
    Text {
        data: String,
    },
}

#[derive(Debug, Clone)]
struct ViewNode {
    kind: ViewNodeKind,
    parent: Option<NodeId>,
}

/// A point in the view: character offset in a text node, child index in
/// an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewPosition {
    pub node: NodeId,
    pub offset: usize,
}

/// The live selection, anchor to focus (focus is the moving end).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRange {
    pub anchor: ViewPosition,
    pub focus: ViewPosition,
}

impl ViewRange {
    pub fn caret(position: ViewPosition) -> Self {
        Self {
            anchor: position,
            focus: position,
        }
    }
}

/// The editable document tree.
#[derive(Debug)]
pub struct EditableView {
    nodes: Vec<ViewNode>,
    root: NodeId,
    selection: Option<ViewRange>,
    focused: bool,
}

impl Default for EditableView {
    fn default() -> Self {
        Self::new()
    }
}

impl EditableView {
    /// Create an empty view with a `div` root.
    pub fn new() -> Self {
        Self::with_root_tag("div")
    }

    pub fn with_root_tag(tag: impl Into<String>) -> Self {
        let root_node = ViewNode {
            kind: ViewNodeKind::Element {
                tag: tag.into(),
                attrs: Attrs::new(),
                children: Vec::new(),
            },
            parent: None,
        };
        Self {
            nodes: vec![root_node],
            root: NodeId(0),
            selection: None,
            focused: false,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    // ── Node queries ──────────────────────────────────────────────────────

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, ViewNodeKind::Text { .. })
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        !self.is_text(id)
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            ViewNodeKind::Element { tag, .. } => Some(tag),
            ViewNodeKind::Text { .. } => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> Option<&Attrs> {
        match &self.nodes[id.0].kind {
            ViewNodeKind::Element { attrs, .. } => Some(attrs),
            ViewNodeKind::Text { .. } => None,
        }
    }

    pub fn text_data(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            ViewNodeKind::Text { data } => Some(data),
            ViewNodeKind::Element { .. } => None,
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.nodes[id.0].kind {
            ViewNodeKind::Element { children, .. } => children,
            ViewNodeKind::Text { .. } => &[],
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Index of `child` among its parent's children.
    pub fn child_index(&self, child: NodeId) -> Option<usize> {
        let parent = self.parent(child)?;
        self.children(parent).iter().position(|&id| id == child)
    }

    // ── Node construction ─────────────────────────────────────────────────

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.push_node(ViewNodeKind::Element {
            tag: tag.into(),
            attrs: Attrs::new(),
            children: Vec::new(),
        })
    }

    pub fn create_text(&mut self, data: impl Into<String>) -> NodeId {
        self.push_node(ViewNodeKind::Text { data: data.into() })
    }

    fn push_node(&mut self, kind: ViewNodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ViewNode { kind, parent: None });
        id
    }

    /// Build a detached subtree from a markup node.
    pub fn build_subtree(&mut self, node: &Node) -> NodeId {
        match node {
            Node::Text(data) => self.create_text(data.clone()),
            Node::Element(el) => {
                let id = self.create_element(el.tag.clone());
                if let ViewNodeKind::Element { attrs, .. } = &mut self.nodes[id.0].kind {
                    *attrs = el.attrs.clone();
                }
                for child in &el.children {
                    let child_id = self.build_subtree(child);
                    self.append_child(id, child_id);
                }
                id
            }
        }
    }

    // ── Structural mutation ───────────────────────────────────────────────

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        match &mut self.nodes[parent.0].kind {
            ViewNodeKind::Element { children, .. } => children.push(child),
            ViewNodeKind::Text { .. } => {}
        }
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        match &mut self.nodes[parent.0].kind {
            ViewNodeKind::Element { children, .. } => {
                let index = index.min(children.len());
                children.insert(index, child);
            }
            ViewNodeKind::Text { .. } => {}
        }
    }

    pub fn remove_child_at(&mut self, parent: NodeId, index: usize) {
        let removed = match &mut self.nodes[parent.0].kind {
            ViewNodeKind::Element { children, .. } if index < children.len() => {
                Some(children.remove(index))
            }
            _ => None,
        };
        if let Some(removed) = removed {
            self.nodes[removed.0].parent = None;
        }
    }

    pub fn replace_child_at(&mut self, parent: NodeId, index: usize, new_child: NodeId) {
        let old = match &mut self.nodes[parent.0].kind {
            ViewNodeKind::Element { children, .. } if index < children.len() => {
                let old = children[index];
                children[index] = new_child;
                Some(old)
            }
            _ => None,
        };
        if let Some(old) = old {
            self.nodes[old.0].parent = None;
        }
        self.nodes[new_child.0].parent = Some(parent);
    }

    // ── Content mutation ──────────────────────────────────────────────────

    pub fn set_text_data(&mut self, id: NodeId, new_data: impl Into<String>) {
        if let ViewNodeKind::Text { data } = &mut self.nodes[id.0].kind {
            *data = new_data.into();
        }
    }

    pub fn set_attribute(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        if let ViewNodeKind::Element { attrs, .. } = &mut self.nodes[id.0].kind {
            attrs.insert(name.into(), value.into());
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if let ViewNodeKind::Element { attrs, .. } = &mut self.nodes[id.0].kind {
            attrs.shift_remove(name);
        }
    }

    // ── Selection and focus ───────────────────────────────────────────────

    pub fn selection(&self) -> Option<ViewRange> {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Option<ViewRange>) {
        self.selection = selection;
    }

    pub fn focused(&self) -> bool {
        self.focused
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    // ── Host input simulation ─────────────────────────────────────────────

    /// Insert text at the caret the way a key press would: into the
    /// focused text node, or as a new text node at an element position.
    /// Moves the caret past the inserted text. No-op without a selection.
    pub fn insert_text_at_caret(&mut self, text: &str) {
        let Some(range) = self.selection else {
            return;
        };
        let focus = range.focus;

        if self.is_text(focus.node) {
            let data = self.text_data(focus.node).unwrap_or_default().to_string();
            let byte = char_to_byte(&data, focus.offset);
            let mut next = data;
            next.insert_str(byte, text);
            self.set_text_data(focus.node, next);
            let caret = ViewPosition {
                node: focus.node,
                offset: focus.offset + text.chars().count(),
            };
            self.selection = Some(ViewRange::caret(caret));
        } else {
            let parent = focus.node;
            let new_text = self.create_text(text.to_string());
            self.insert_child(parent, focus.offset, new_text);
            let caret = ViewPosition {
                node: new_text,
                offset: text.chars().count(),
            };
            self.selection = Some(ViewRange::caret(caret));
        }
    }

    // ── Comparison and export ─────────────────────────────────────────────

    /// Deep equality between a view node and a markup node.
    pub fn node_matches(&self, id: NodeId, target: &Node) -> bool {
        match (&self.nodes[id.0].kind, target) {
            (ViewNodeKind::Text { data }, Node::Text(expected)) => data == expected,
            (
                ViewNodeKind::Element {
                    tag,
                    attrs,
                    children,
                },
                Node::Element(expected),
            ) => {
                tag == &expected.tag
                    && attrs == &expected.attrs
                    && children.len() == expected.children.len()
                    && children
                        .iter()
                        .zip(&expected.children)
                        .all(|(&child, expected_child)| self.node_matches(child, expected_child))
            }
            _ => false,
        }
    }

    /// Export a subtree as a markup node.
    pub fn to_markup(&self, id: NodeId) -> Node {
        match &self.nodes[id.0].kind {
            ViewNodeKind::Text { data } => Node::Text(data.clone()),
            ViewNodeKind::Element {
                tag,
                attrs,
                children,
            } => {
                let mut element = Element::new(tag.clone());
                element.attrs = attrs.clone();
                element.children = children.iter().map(|&child| self.to_markup(child)).collect();
                Node::Element(element)
            }
        }
    }

    /// Serialized content of the root, for assertions and debugging.
    pub fn inner_html(&self) -> String {
        let children: Vec<Node> = self
            .children(self.root)
            .iter()
            .map(|&child| self.to_markup(child))
            .collect();
        to_html(&children)
    }
}

pub(crate) fn char_to_byte(data: &str, offset: usize) -> usize {
    data.char_indices()
        .nth(offset)
        .map(|(i, _)| i)
        .unwrap_or(data.len())
}

// ── Tests ─────────────────────────────────────────────────────────────────
