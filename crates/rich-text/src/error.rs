//! Error taxonomy for the editing core.
//!
//! Every variant here describes a condition the core has already recovered
//! from. Nothing in the editing path returns these as `Err`; they are
//! surfaced through the controller's error sink so the hosting application
//! can report them without the session crashing.

use std::fmt;

use thiserror::Error;

/// Pipeline stage at which a format-type hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    AfterParse,
    BeforeSerialize,
    PrepareEditableTree,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookStage::AfterParse => "after-parse",
            HookStage::BeforeSerialize => "before-serialize",
            HookStage::PrepareEditableTree => "prepare-editable-tree",
        };
        f.write_str(name)
    }
}

/// A recovered fault inside the editing core.
#[derive(Debug, Error)]
pub enum RichTextError {
    /// The parser dropped an element it could not map to a registered
    /// format type; its content was kept as plain text.
    #[error("unrecognized element <{tag}> stripped, content kept")]
    MalformedMarkup { tag: String },

    /// A format mutation received offsets outside the value; they were
    /// clamped to valid bounds.
    #[error("range {start}..{end} clamped to value length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },

    /// An event arrived after the session was unmounted and was ignored.
    #[error("event ignored: view is detached")]
    DetachedViewAccess,

    /// A format-type hook failed; its contribution was skipped for the
    /// cycle.
    #[error("format type `{format}` failed during {stage}: {message}")]
    PluginHook {
        format: String,
        stage: HookStage,
        message: String,
    },
}

/// Error type returned by format-type hooks.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HookError {
    pub message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_stage() {
        let err = RichTextError::PluginHook {
            format: "mark".to_string(),
            stage: HookStage::AfterParse,
            message: "boom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "format type `mark` failed during after-parse: boom"
        );
    }

    #[test]
    fn invalid_range_display() {
        let err = RichTextError::InvalidRange {
            start: 7,
            end: 3,
            len: 5,
        };
        assert_eq!(err.to_string(), "range 7..3 clamped to value length 5");
    }
}
