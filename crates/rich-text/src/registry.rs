//! Format-type registry — the registered-capability table for annotation
//! types.
//!
//! Each [`FormatType`] declares how one annotation kind maps to markup
//! (tag, class, static attributes), whether it is an object (replacement)
//! type, whether it is prepare-only (a view decoration stripped before
//! serialization), and optional hooks invoked at the parse, serialize and
//! reconcile seams. Hooks run in registration order; an absent hook is a
//! no-op by construction.

use std::fmt;

use rich_text_markup::Attrs;

use crate::error::{HookError, HookStage, RichTextError};
use crate::value::FormattedValue;

/// A hook mutating a value at one of the pipeline seams.
pub type FormatHook = Box<dyn Fn(&mut FormattedValue) -> Result<(), HookError>>;

/// Declaration of one annotation type.
pub struct FormatType {
    /// Annotation kind, e.g. `"core/bold"` or `"bold"`.
    pub name: String,
    /// Element tag the type parses from and serializes to.
    pub tag_name: String,
    /// Class token required on the element for a match, and emitted on
    /// serialization.
    pub class_name: Option<String>,
    /// Static attributes contributed to the serialized element.
    pub attributes: Attrs,
    /// Object types occupy one replacement slot instead of wrapping text.
    pub object: bool,
    /// Prepare-only types exist in the editable view only; the serializer
    /// skips them and `after_parse` hooks re-derive them.
    pub prepare_only: bool,
    pub after_parse: Option<FormatHook>,
    pub before_serialize: Option<FormatHook>,
    pub prepare_editable_tree: Option<FormatHook>,
}

impl FormatType {
    pub fn new(name: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag_name: tag_name.into().to_ascii_lowercase(),
            class_name: None,
            attributes: Attrs::new(),
            object: false,
            prepare_only: false,
            after_parse: None,
            before_serialize: None,
            prepare_editable_tree: None,
        }
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn object(mut self) -> Self {
        self.object = true;
        self
    }

    pub fn prepare_only(mut self) -> Self {
        self.prepare_only = true;
        self
    }

    pub fn on_after_parse(
        mut self,
        hook: impl Fn(&mut FormattedValue) -> Result<(), HookError> + 'static,
    ) -> Self {
        self.after_parse = Some(Box::new(hook));
        self
    }

    pub fn on_before_serialize(
        mut self,
        hook: impl Fn(&mut FormattedValue) -> Result<(), HookError> + 'static,
    ) -> Self {
        self.before_serialize = Some(Box::new(hook));
        self
    }

    pub fn on_prepare_editable_tree(
        mut self,
        hook: impl Fn(&mut FormattedValue) -> Result<(), HookError> + 'static,
    ) -> Self {
        self.prepare_editable_tree = Some(Box::new(hook));
        self
    }

    /// True when an element with this tag and class set matches the type.
    fn matches(&self, tag: &str, attrs: &Attrs) -> bool {
        if self.tag_name != tag {
            return false;
        }
        match &self.class_name {
            None => true,
            Some(class_name) => attrs
                .get("class")
                .map(|value| value.split_ascii_whitespace().any(|token| token == class_name))
                .unwrap_or(false),
        }
    }
}

impl fmt::Debug for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatType")
            .field("name", &self.name)
            .field("tag_name", &self.tag_name)
            .field("class_name", &self.class_name)
            .field("object", &self.object)
            .field("prepare_only", &self.prepare_only)
            .finish_non_exhaustive()
    }
}

// ── FormatRegistry ────────────────────────────────────────────────────────

/// Registration-ordered table of format types.
///
/// The registry is the parser's allow-list: elements matching no entry are
/// stripped, content kept.
#[derive(Debug, Default)]
pub struct FormatRegistry {
    types: Vec<FormatType>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type. A type with the same name is replaced in place,
    /// keeping its registration position.
    pub fn register(&mut self, format_type: FormatType) {
        match self.types.iter().position(|t| t.name == format_type.name) {
            Some(position) => self.types[position] = format_type,
            None => self.types.push(format_type),
        }
    }

    pub fn by_name(&self, name: &str) -> Option<&FormatType> {
        self.types.iter().find(|t| t.name == name)
    }

    /// First registered type matching the element, by tag and class.
    pub fn match_element(&self, tag: &str, attrs: &Attrs) -> Option<&FormatType> {
        self.types.iter().find(|t| t.matches(tag, attrs))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormatType> {
        self.types.iter()
    }

    pub fn is_prepare_only(&self, kind: &str) -> bool {
        self.by_name(kind).map(|t| t.prepare_only).unwrap_or(false)
    }

    // ── Hook pipeline ─────────────────────────────────────────────────────

    pub fn run_after_parse(
        &self,
        value: &mut FormattedValue,
        report: &mut dyn FnMut(RichTextError),
    ) {
        self.run_stage(HookStage::AfterParse, value, report);
    }

    pub fn run_before_serialize(
        &self,
        value: &mut FormattedValue,
        report: &mut dyn FnMut(RichTextError),
    ) {
        self.run_stage(HookStage::BeforeSerialize, value, report);
    }

    pub fn run_prepare_editable_tree(
        &self,
        value: &mut FormattedValue,
        report: &mut dyn FnMut(RichTextError),
    ) {
        self.run_stage(HookStage::PrepareEditableTree, value, report);
    }

    /// Run every hook registered for `stage`, in registration order.
    ///
    /// Each hook mutates a scratch clone; a failing hook's changes are
    /// discarded for the cycle and the failure is reported, the pipeline
    /// continues.
    fn run_stage(
        &self,
        stage: HookStage,
        value: &mut FormattedValue,
        report: &mut dyn FnMut(RichTextError),
    ) {
        for format_type in &self.types {
            let hook = match stage {
                HookStage::AfterParse => &format_type.after_parse,
                HookStage::BeforeSerialize => &format_type.before_serialize,
                HookStage::PrepareEditableTree => &format_type.prepare_editable_tree,
            };
            let Some(hook) = hook else {
                continue;
            };
            let mut scratch = value.clone();
            match hook(&mut scratch) {
                Ok(()) => *value = scratch,
                Err(err) => report(RichTextError::PluginHook {
                    format: format_type.name.clone(),
                    stage,
                    message: err.message,
                }),
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
