//! Recovering tokenizer and tree builder for the inline-HTML subset.
//!
//! Parsing never fails: constructs that cannot be mapped to an element
//! degrade to literal text or are dropped locally. Comments, doctypes and
//! processing instructions are skipped. A close tag that matches an open
//! ancestor closes every element in between; one that matches nothing is
//! dropped. Elements still open at end of input are closed there.

use crate::entities;
use crate::node::{is_void_tag, Attrs, Element, Node};

/// Parse a markup string into a list of sibling nodes.
pub fn parse(input: &str) -> Vec<Node> {
    Parser::new(input).run()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    stack: Vec<Element>,
    roots: Vec<Node>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            stack: Vec::new(),
            roots: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Node> {
        while self.pos < self.input.len() {
            let rest = &self.input[self.pos..];
            match rest.find('<') {
                None => {
                    self.append_text(rest);
                    self.pos = self.input.len();
                }
                Some(lt) => {
                    if lt > 0 {
                        self.append_text(&rest[..lt]);
                        self.pos += lt;
                    }
                    self.consume_markup();
                }
            }
        }

        // Close everything still open at end of input.
        while let Some(element) = self.stack.pop() {
            self.append_node(Node::Element(element));
        }

        self.roots
    }

    /// Consume one construct starting at `<`.
    fn consume_markup(&mut self) {
        let rest = &self.input[self.pos..];

        if rest.starts_with("<!--") {
            self.pos += match rest.find("-->") {
                Some(end) => end + 3,
                None => rest.len(),
            };
        } else if rest.starts_with("</") {
            self.consume_close_tag();
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            self.pos += match rest.find('>') {
                Some(end) => end + 1,
                None => rest.len(),
            };
        } else if rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            self.consume_open_tag();
        } else {
            // Not markup, keep the `<` as text.
            self.append_text("<");
            self.pos += 1;
        }
    }

    fn consume_close_tag(&mut self) {
        self.pos += 2;
        let name = self.take_tag_name();
        self.pos += match self.input[self.pos..].find('>') {
            Some(end) => end + 1,
            None => self.input.len() - self.pos,
        };

        let Some(open) = self.stack.iter().rposition(|el| el.tag == name) else {
            return;
        };
        while self.stack.len() > open {
            let Some(element) = self.stack.pop() else {
                break;
            };
            self.append_node(Node::Element(element));
        }
    }

    fn consume_open_tag(&mut self) {
        self.pos += 1;
        let tag = self.take_tag_name();
        let attrs = self.take_attributes();

        let mut self_closing = false;
        if self.peek() == Some('/') {
            self_closing = true;
            self.pos += 1;
        }
        if self.peek() == Some('>') {
            self.pos += 1;
        }

        let element = Element {
            tag: tag.clone(),
            attrs,
            children: Vec::new(),
        };
        if self_closing || is_void_tag(&tag) {
            self.append_node(Node::Element(element));
        } else {
            self.stack.push(element);
        }
    }

    fn take_tag_name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '-' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_ascii_lowercase()
    }

    fn take_attributes(&mut self) -> Attrs {
        let mut attrs = Attrs::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None | Some('>') | Some('/') => break,
                _ => {}
            }

            let name = self.take_attribute_name();
            if name.is_empty() {
                // Stray character, skip it so the scan advances.
                if let Some(c) = self.peek() {
                    self.pos += c.len_utf8();
                }
                continue;
            }

            self.skip_whitespace();
            let value = if self.peek() == Some('=') {
                self.pos += 1;
                self.skip_whitespace();
                self.take_attribute_value()
            } else {
                String::new()
            };

            // First declaration wins, as in HTML.
            attrs.entry(name).or_insert(value);
        }
        attrs
    }

    fn take_attribute_name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '=' || c == '>' || c == '/' {
                break;
            }
            self.pos += c.len_utf8();
        }
        self.input[start..self.pos].to_ascii_lowercase()
    }

    fn take_attribute_value(&mut self) -> String {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let start = self.pos;
                let raw = match self.input[self.pos..].find(quote) {
                    Some(end) => {
                        self.pos += end + 1;
                        &self.input[start..start + end]
                    }
                    None => {
                        // Unterminated quote runs to end of input.
                        self.pos = self.input.len();
                        &self.input[start..]
                    }
                };
                entities::decode(raw)
            }
            _ => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_whitespace() || c == '>' {
                        break;
                    }
                    self.pos += c.len_utf8();
                }
                entities::decode(&self.input[start..self.pos])
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn append_text(&mut self, raw: &str) {
        let decoded = entities::decode(raw);
        self.append_node(Node::Text(decoded));
    }

    /// Attach a finished node to the innermost open element, merging
    /// adjacent text leaves.
    fn append_node(&mut self, node: Node) {
        let children = match self.stack.last_mut() {
            Some(open) => &mut open.children,
            None => &mut self.roots,
        };
        if let (Node::Text(data), Some(Node::Text(last))) = (&node, children.last_mut()) {
            last.push_str(data);
            return;
        }
        children.push(node);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
