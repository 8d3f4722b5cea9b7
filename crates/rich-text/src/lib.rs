//! rich-text — formatted-text value model and editable-view
//! synchronization engine.
//!
//! The [`value::FormattedValue`] is the single source of truth for an
//! editing session: text, per-character format annotations, embedded
//! replacement objects and the selection. The editable view is a derived
//! projection of it. [`parse`] and [`serialize`] convert between values
//! and markup strings, [`reconcile`] patches the live view with minimal
//! mutation and reads it back after input events, and
//! [`controller::SyncController`] orchestrates one session: external
//! value/selection updates in, change/selection callbacks out.
//!
//! # Quick start
//!
//! ```rust
//! use rich_text::controller::{RichTextSettings, SyncController};
//! use rich_text::registry::{FormatRegistry, FormatType};
//! use rich_text::view::EditableView;
//!
//! let mut registry = FormatRegistry::new();
//! registry.register(FormatType::new("bold", "strong"));
//!
//! let mut controller = SyncController::new(registry, RichTextSettings::default());
//! let mut view = EditableView::new();
//! controller.mount(&mut view, "<strong>ab</strong>c", Some(0), Some(0));
//!
//! assert_eq!(controller.value().text, "abc");
//! assert_eq!(view.inner_html(), "<strong>ab</strong>c");
//! ```

pub mod controller;
pub mod error;
pub mod parse;
pub mod reconcile;
pub mod registry;
pub mod serialize;
pub mod value;
pub mod view;

pub use controller::{ChangePayload, RichTextSettings, SessionState, SyncController};
pub use error::{HookError, HookStage, RichTextError};
pub use parse::{collapse_white_space, parse_markup, parse_markup_with_report};
pub use registry::{FormatRegistry, FormatType};
pub use serialize::to_markup_string;
pub use value::{FormatAnnotation, FormatSet, FormattedValue, Replacement};
pub use view::{EditableView, NodeId, ViewPosition, ViewRange};
