//! Markup tree node types.

use indexmap::IndexMap;

/// Element attributes, preserving insertion order.
pub type Attrs = IndexMap<String, String>;

/// A node in a markup tree: a text leaf or an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Text content leaf. Stored decoded (no entity references).
    Text(String),
    /// Element with tag, attributes and children.
    Element(Element),
}

/// A markup element: lowercase tag name, insertion-ordered attributes,
/// and child nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Attrs,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Attrs::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Void elements never take children and serialize without a close tag.
    pub fn is_void(&self) -> bool {
        is_void_tag(&self.tag)
    }
}

impl Node {
    pub fn text(data: impl Into<String>) -> Self {
        Node::Text(data.into())
    }

    pub fn element(element: Element) -> Self {
        Node::Element(element)
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(data) => Some(data),
            Node::Element(_) => None,
        }
    }
}

/// HTML void element tags.
pub fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_tags() {
        assert!(is_void_tag("br"));
        assert!(is_void_tag("img"));
        assert!(!is_void_tag("strong"));
        assert!(!is_void_tag("span"));
    }

    #[test]
    fn builder_preserves_attr_order() {
        let el = Element::new("a")
            .with_attr("href", "https://example.com")
            .with_attr("target", "_blank");
        let keys: Vec<_> = el.attrs.keys().cloned().collect();
        assert_eq!(keys, vec!["href", "target"]);
    }
}
