//! Synchronization controller for one editing session.
//!
//! Owns the current [`FormattedValue`] and orchestrates the flow between
//! the external markup value, the live view and the outward callbacks.
//! Value updates happen synchronously inside the event handlers, so a
//! newer keystroke can never overwrite a stale value; view patching is
//! synchronous where the caret depends on it and deferrable (via
//! [`SyncController::flush`]) for committed values.
//!
//! Callback ordering is fixed: for one user action the selection
//! notification always precedes the content notification, so history
//! systems record the pre-edit selection first.

use tracing::{debug, warn};

use crate::error::RichTextError;
use crate::parse::{collapse_white_space, parse_markup_with_report};
use crate::reconcile::{apply_to_view, extract_from_view, ApplyOptions};
use crate::registry::FormatRegistry;
use crate::serialize::to_markup_string;
use crate::value::{ops, FormatSet, FormattedValue};
use crate::view::EditableView;

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    /// The view matches the current value.
    Synced,
    /// The value changed but the view has not been patched yet.
    DirtyPendingApply,
    /// Terminal; every further event is a no-op.
    Unmounted,
}

/// Payload handed to the change callback next to the serialized markup.
#[derive(Debug, Clone)]
pub struct ChangePayload {
    pub formats: Vec<FormatSet>,
    pub text: String,
}

/// Session configuration.
#[derive(Debug, Clone, Default)]
pub struct RichTextSettings {
    /// Placeholder surfaced while the value is empty.
    pub placeholder: Option<String>,
    /// Skip whitespace collapsing of the external markup.
    pub preserve_white_space: bool,
    /// Treat the content as plain text: formats and replacements are
    /// dropped after parsing and the text itself is the serialized form.
    pub disable_formats: bool,
}

type ChangeCallback = Box<dyn FnMut(&str, &ChangePayload)>;
type SelectionCallback = Box<dyn FnMut(Option<usize>, Option<usize>)>;
type ErrorCallback = Box<dyn FnMut(&RichTextError)>;

/// Controller for one mounted editing session.
pub struct SyncController {
    registry: FormatRegistry,
    settings: RichTextSettings,
    state: SessionState,
    value: FormattedValue,
    markup: String,
    on_change: Option<ChangeCallback>,
    on_selection_change: Option<SelectionCallback>,
    on_error: Option<ErrorCallback>,
}

impl SyncController {
    pub fn new(registry: FormatRegistry, settings: RichTextSettings) -> Self {
        Self {
            registry,
            settings,
            state: SessionState::Uninitialized,
            value: FormattedValue::default(),
            markup: String::new(),
            on_change: None,
            on_selection_change: None,
            on_error: None,
        }
    }

    pub fn on_change(&mut self, callback: impl FnMut(&str, &ChangePayload) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    pub fn on_selection_change(
        &mut self,
        callback: impl FnMut(Option<usize>, Option<usize>) + 'static,
    ) {
        self.on_selection_change = Some(Box::new(callback));
    }

    pub fn on_error(&mut self, callback: impl FnMut(&RichTextError) + 'static) {
        self.on_error = Some(Box::new(callback));
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The latest value, up to date even while a re-render is pending.
    pub fn value(&self) -> &FormattedValue {
        &self.value
    }

    /// The last markup handed to (or received from) the outside.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    // ── Mount / unmount ───────────────────────────────────────────────────

    /// Initialize the session from the external markup value and selection
    /// and render it into the view.
    pub fn mount(
        &mut self,
        view: &mut EditableView,
        markup: &str,
        start: Option<usize>,
        end: Option<usize>,
    ) {
        if self.state == SessionState::Unmounted {
            self.report(RichTextError::DetachedViewAccess);
            return;
        }
        debug!(state = ?self.state, "mounting rich-text session");
        self.markup = markup.to_string();
        self.rebuild_value_from_markup(start, end);
        self.state = SessionState::DirtyPendingApply;
        self.reconcile(view);
    }

    /// Tear the session down. Every event handler afterwards is a no-op.
    pub fn unmount(&mut self) {
        debug!("unmounting rich-text session");
        self.state = SessionState::Unmounted;
        self.on_change = None;
        self.on_selection_change = None;
    }

    // ── External updates ──────────────────────────────────────────────────

    /// The external value changed out-of-band. The external value wins:
    /// internal state is rebuilt from it. A markup string identical to the
    /// last known one is ignored.
    pub fn set_external_value(&mut self, view: &mut EditableView, markup: &str) {
        if !self.live() {
            return;
        }
        if markup == self.markup {
            return;
        }
        debug!("external value changed, rebuilding");
        self.markup = markup.to_string();
        let (start, end) = (self.value.start, self.value.end);
        self.rebuild_value_from_markup(start, end);
        self.state = SessionState::DirtyPendingApply;
        self.reconcile(view);
    }

    /// The external selection store moved the selection. Applied
    /// synchronously: focus restoration must not wait for a paint cycle.
    pub fn set_external_selection(
        &mut self,
        view: &mut EditableView,
        start: Option<usize>,
        end: Option<usize>,
    ) {
        if !self.live() {
            return;
        }
        if start == self.value.start && end == self.value.end {
            return;
        }
        if let (Some(s), Some(e)) = (start, end) {
            let len = self.value.len();
            if s > len || e > len || s > e {
                self.report(RichTextError::InvalidRange {
                    start: s,
                    end: e,
                    len,
                });
            }
        }
        self.value = self.value.with_selection(start, end);
        view.set_focused(true);
        self.state = SessionState::DirtyPendingApply;
        self.reconcile(view);
    }

    // ── View events ───────────────────────────────────────────────────────

    /// A raw input event fired on the view. The view is the source of
    /// truth for what the user typed: extract it, run the format pipeline
    /// and notify outward. No reconciliation happens when the extraction
    /// is semantically identical to the current value.
    pub fn handle_input(&mut self, view: &mut EditableView) {
        if !self.live() {
            return;
        }

        let mut extracted = extract_from_view(view, &self.registry);
        if self.settings.disable_formats {
            strip_formats(&mut extracted);
        }

        if extracted.equals(&self.value) {
            // Content unchanged; at most the caret moved.
            if extracted.start != self.value.start || extracted.end != self.value.end {
                self.value = self
                    .value
                    .with_selection(extracted.start, extracted.end);
                self.emit_selection_change();
            }
            return;
        }

        // A collapsed caret keeps its pending formats across the edit.
        if extracted.is_collapsed() {
            extracted.active_formats = self.value.active_formats.clone();
        }

        if !self.settings.disable_formats {
            let mut errors = Vec::new();
            self.registry
                .run_after_parse(&mut extracted, &mut |err| errors.push(err));
            self.drain(errors);
        }

        self.value = extracted;
        self.markup = self.serialize_current();
        self.emit_callbacks();

        // The view already holds the typed content; the pass only applies
        // decorations and padding.
        self.state = SessionState::DirtyPendingApply;
        self.reconcile(view);
    }

    /// The view's selection changed without a content change.
    pub fn handle_selection_change(&mut self, view: &mut EditableView) {
        if !self.live() {
            return;
        }
        let extracted = extract_from_view(view, &self.registry);
        if extracted.start == self.value.start && extracted.end == self.value.end {
            return;
        }
        self.value = self
            .value
            .with_selection(extracted.start, extracted.end);
        self.emit_selection_change();
    }

    // ── Programmatic edits ────────────────────────────────────────────────

    /// Commit a value produced outside the view (toolbar, format plugin).
    /// Callbacks fire synchronously; the view patch is deferred until
    /// [`SyncController::flush`] so the host can batch it with a paint
    /// cycle.
    pub fn commit(&mut self, new_value: FormattedValue) {
        if !self.live() {
            return;
        }
        let selection_changed =
            new_value.start != self.value.start || new_value.end != self.value.end;
        if new_value.equals(&self.value) && !selection_changed {
            return;
        }
        self.value = new_value;
        self.markup = self.serialize_current();
        self.emit_callbacks();
        self.state = SessionState::DirtyPendingApply;
    }

    /// Splice a fragment over the current selection (paste/drop/replace
    /// pipelines) and synchronize immediately.
    pub fn replace_selection(&mut self, view: &mut EditableView, fragment: &FormattedValue) {
        if !self.live() {
            return;
        }
        let start = self.value.start.unwrap_or(self.value.len());
        let end = self.value.end.unwrap_or(start);
        let next = ops::insert(&self.value, fragment, start, end);
        self.commit(next);
        self.flush(view);
    }

    /// Patch the view to match a value committed earlier. No-op unless a
    /// commit is pending.
    pub fn flush(&mut self, view: &mut EditableView) {
        if !self.live() {
            return;
        }
        if self.state == SessionState::DirtyPendingApply {
            self.reconcile(view);
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Liveness gate at the top of every handler. Events racing teardown
    /// are reported and ignored.
    fn live(&mut self) -> bool {
        match self.state {
            SessionState::Unmounted => {
                self.report(RichTextError::DetachedViewAccess);
                false
            }
            _ => true,
        }
    }

    fn rebuild_value_from_markup(&mut self, start: Option<usize>, end: Option<usize>) {
        let source = if self.settings.preserve_white_space {
            self.markup.clone()
        } else {
            collapse_white_space(&self.markup)
        };

        let mut errors = Vec::new();
        let mut value = parse_markup_with_report(&source, &self.registry, &mut |err| {
            errors.push(err)
        });

        if self.settings.disable_formats {
            strip_formats(&mut value);
        } else {
            self.registry
                .run_after_parse(&mut value, &mut |err| errors.push(err));
        }
        self.drain(errors);

        self.value = value.with_selection(start, end);
    }

    fn serialize_current(&mut self) -> String {
        if self.settings.disable_formats {
            return self.value.text.clone();
        }
        let mut outgoing = self.value.clone();
        let mut errors = Vec::new();
        self.registry
            .run_before_serialize(&mut outgoing, &mut |err| errors.push(err));
        self.drain(errors);
        to_markup_string(&outgoing, &self.registry)
    }

    fn reconcile(&mut self, view: &mut EditableView) {
        let options = ApplyOptions {
            placeholder: self.settings.placeholder.clone(),
        };
        let errors = apply_to_view(&self.value, view, &self.registry, &options);
        self.drain(errors);
        self.state = SessionState::Synced;
    }

    /// Selection first, then content, per the ordering guarantee.
    fn emit_callbacks(&mut self) {
        self.emit_selection_change();
        let payload = ChangePayload {
            formats: self.value.formats.clone(),
            text: self.value.text.clone(),
        };
        if let Some(callback) = self.on_change.as_mut() {
            callback(&self.markup, &payload);
        }
    }

    fn emit_selection_change(&mut self) {
        if let Some(callback) = self.on_selection_change.as_mut() {
            callback(self.value.start, self.value.end);
        }
    }

    fn drain(&mut self, errors: Vec<RichTextError>) {
        for err in errors {
            self.report(err);
        }
    }

    fn report(&mut self, err: RichTextError) {
        warn!(error = %err, "recovered rich-text fault");
        if let Some(callback) = self.on_error.as_mut() {
            callback(&err);
        }
    }
}

fn strip_formats(value: &mut FormattedValue) {
    let len = value.len();
    value.formats = vec![FormatSet::new(); len];
    value.replacements = vec![None; len];
    value.active_formats = None;
}

// ── Tests ─────────────────────────────────────────────────────────────────
