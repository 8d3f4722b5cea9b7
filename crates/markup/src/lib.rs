//! rich-text-markup — markup tree types, HTML tokenizer, and serializer.
//!
//! Represents inline HTML as a tree of [`Node`]s: text leaves and elements
//! with insertion-ordered attributes. The parser is recovering: any input
//! produces a tree, malformed constructs degrade to literal text or are
//! dropped locally. The serializer emits one canonical form, so serializing
//! a parsed tree twice yields byte-identical output.

pub mod entities;
pub mod node;
pub mod parser;
pub mod serializer;

pub use node::{Attrs, Element, Node};
pub use parser::parse;
pub use serializer::{to_html, to_html_node};
