//! FormattedValue — text plus per-character format annotations, embedded
//! replacement objects, and a selection range.
//!
//! The value is the single source of truth for an editing session. The
//! editable view is a derived projection of it, rebuilt by the reconciler.
//! `formats` and `replacements` run parallel to `text`, one slot per
//! character (Unicode scalar value). Selection offsets are character
//! offsets; `start == end` is a caret, `None` means no selection is known.

pub mod ops;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Character occupying the slot of an embedded object.
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

/// Character representing a line break inside the value.
pub const LINE_BREAK: char = '\n';

/// A typed, attributed marker applied to a character slot.
///
/// Annotation order within a slot is element-nesting order, outermost
/// first, and is preserved across parse/serialize round trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatAnnotation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
}

impl FormatAnnotation {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: IndexMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// The set of annotations active on one character slot, outermost first.
pub type FormatSet = Vec<FormatAnnotation>;

/// An embedded non-text object occupying one character slot.
///
/// The slot's character is [`OBJECT_REPLACEMENT`]; annotations on the slot
/// wrap the object, they do not format text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replacement {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Replacement {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: IndexMap::new(),
            data: None,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

// ── FormattedValue ────────────────────────────────────────────────────────

/// Formatted text with a selection.
///
/// Invariants: `formats.len()` and `replacements.len()` equal the number of
/// characters in `text`; `0 <= start <= end <= len` whenever both offsets
/// are set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormattedValue {
    pub text: String,
    pub formats: Vec<FormatSet>,
    pub replacements: Vec<Option<Replacement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
    /// Annotations considered active at the caret for the next input.
    /// `None` means "derive from the selection boundary on demand".
    #[serde(skip)]
    pub active_formats: Option<Vec<FormatAnnotation>>,
}

impl FormattedValue {
    /// Build a value from plain text, every slot unformatted.
    pub fn from_plain_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let len = text.chars().count();
        Self {
            text,
            formats: vec![FormatSet::new(); len],
            replacements: vec![None; len],
            start: None,
            end: None,
            active_formats: None,
        }
    }

    /// Number of character slots.
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// True when the selection is a caret.
    pub fn is_collapsed(&self) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start == end,
            _ => false,
        }
    }

    /// Text content with object-replacement characters stripped.
    pub fn text_content(&self) -> String {
        self.text.chars().filter(|&c| c != OBJECT_REPLACEMENT).collect()
    }

    /// Semantic equality of content: text, formats and replacements.
    /// Selection state is excluded.
    pub fn equals(&self, other: &Self) -> bool {
        self.text == other.text
            && self.formats == other.formats
            && self.replacements == other.replacements
    }

    /// Return the value reselected to `start..end`, offsets clamped to the
    /// value bounds and ordered. Resets the active-format cache.
    pub fn with_selection(&self, start: Option<usize>, end: Option<usize>) -> Self {
        let mut next = self.clone();
        let len = next.len();
        next.start = start.map(|s| s.min(len));
        next.end = match (next.start, end) {
            (Some(s), Some(e)) => Some(e.clamp(s, len)),
            (Some(s), None) => Some(s),
            (None, _) => None,
        };
        next.active_formats = None;
        next
    }

    /// Clamp a half-open range to the value bounds. Returns the clamped
    /// range and whether clamping changed anything.
    pub(crate) fn clamp_range(&self, start: usize, end: usize) -> (usize, usize, bool) {
        let len = self.len();
        let clamped_start = start.min(len);
        let clamped_end = end.clamp(clamped_start, len);
        (
            clamped_start,
            clamped_end,
            clamped_start != start || clamped_end != end,
        )
    }

    /// Byte offset of character offset `offset` into `text`.
    pub(crate) fn byte_offset(&self, offset: usize) -> usize {
        self.text
            .char_indices()
            .nth(offset)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    // ── Active formats ────────────────────────────────────────────────────

    /// Annotations active for input at the current selection.
    ///
    /// Caret: the cached set when present, otherwise the smaller of the
    /// two boundary sets, so a caret sits outside a format boundary by
    /// default. Expanded selection: the intersection of every slot's set
    /// in range.
    pub fn active_formats(&self) -> Vec<FormatAnnotation> {
        let Some(start) = self.start else {
            return Vec::new();
        };
        let end = self.end.unwrap_or(start);

        if start == end {
            if let Some(cached) = &self.active_formats {
                return cached.clone();
            }
            let before: &[FormatAnnotation] = if start == 0 {
                &[]
            } else {
                self.formats.get(start - 1).map(Vec::as_slice).unwrap_or(&[])
            };
            let after: &[FormatAnnotation] =
                self.formats.get(start).map(Vec::as_slice).unwrap_or(&[]);
            return if before.len() < after.len() {
                before.to_vec()
            } else {
                after.to_vec()
            };
        }

        let end = end.min(self.len());
        if start >= end {
            return Vec::new();
        }
        let Some(first) = self.formats.get(start) else {
            return Vec::new();
        };
        let mut active = first.clone();
        for set in &self.formats[start + 1..end] {
            active.retain(|annotation| set.contains(annotation));
            if active.is_empty() {
                break;
            }
        }
        active
    }

    /// The active annotation of the given kind, if any.
    pub fn get_active_format(&self, kind: &str) -> Option<FormatAnnotation> {
        self.active_formats()
            .into_iter()
            .find(|annotation| annotation.kind == kind)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
