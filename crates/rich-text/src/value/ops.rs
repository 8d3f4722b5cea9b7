//! Format and range mutations over [`FormattedValue`].
//!
//! All operations are immutable updates: the input is never modified, a
//! new value is returned, so callers can snapshot values for history.
//! Offsets are half-open character ranges; out-of-bounds or inverted
//! offsets are clamped to the value bounds.

use super::{FormatAnnotation, FormatSet, FormattedValue};

/// Apply `annotation` to every slot in `[start, end)`.
///
/// A slot that already carries an annotation of the same kind has it
/// replaced in place, keeping its nesting position; otherwise the
/// annotation is added innermost. An empty range leaves content untouched
/// and instead records the annotation as active at the caret, so the next
/// input picks it up.
pub fn apply_format(
    value: &FormattedValue,
    annotation: FormatAnnotation,
    start: usize,
    end: usize,
) -> FormattedValue {
    let (start, end, _) = value.clamp_range(start, end);
    let mut next = value.clone();

    for set in &mut next.formats[start..end] {
        match set.iter().position(|existing| existing.kind == annotation.kind) {
            Some(position) => set[position] = annotation.clone(),
            None => set.push(annotation.clone()),
        }
    }

    // Revise the caret set as well, so input after the operation carries
    // the new annotation and same-kind annotations use the latest
    // attributes.
    let mut active = value.active_formats();
    active.retain(|existing| existing.kind != annotation.kind);
    active.push(annotation);
    next.active_formats = Some(active);
    next
}

/// Remove every annotation of `kind` from the slots in `[start, end)`,
/// regardless of nesting depth. An empty range only clears the kind from
/// the caret's active set.
pub fn remove_format(
    value: &FormattedValue,
    kind: &str,
    start: usize,
    end: usize,
) -> FormattedValue {
    let (start, end, _) = value.clamp_range(start, end);
    let mut next = value.clone();

    for set in &mut next.formats[start..end] {
        set.retain(|annotation| annotation.kind != kind);
    }

    let mut active = value.active_formats();
    active.retain(|annotation| annotation.kind != kind);
    next.active_formats = Some(active);
    next
}

/// Apply or remove `annotation` over the current selection, depending on
/// whether its kind is currently active. Without a selection the value is
/// returned unchanged.
pub fn toggle_format(value: &FormattedValue, annotation: FormatAnnotation) -> FormattedValue {
    let (Some(start), Some(end)) = (value.start, value.end) else {
        return value.clone();
    };
    if value.get_active_format(&annotation.kind).is_some() {
        remove_format(value, &annotation.kind, start, end)
    } else {
        apply_format(value, annotation, start, end)
    }
}

/// Replace `[start, end)` with `fragment`, splicing its text, formats and
/// replacements in place. The selection collapses to a caret after the
/// inserted fragment.
pub fn insert(
    value: &FormattedValue,
    fragment: &FormattedValue,
    start: usize,
    end: usize,
) -> FormattedValue {
    let (start, end, _) = value.clamp_range(start, end);
    let mut next = value.clone();

    let byte_start = next.byte_offset(start);
    let byte_end = next.byte_offset(end);
    next.text.replace_range(byte_start..byte_end, &fragment.text);
    next.formats
        .splice(start..end, fragment.formats.iter().cloned());
    next.replacements
        .splice(start..end, fragment.replacements.iter().cloned());

    let caret = start + fragment.len();
    next.start = Some(caret);
    next.end = Some(caret);
    next.active_formats = None;
    next
}

/// Delete the characters in `[start, end)`. The selection collapses to a
/// caret at `start`.
pub fn remove(value: &FormattedValue, start: usize, end: usize) -> FormattedValue {
    insert(value, &FormattedValue::default(), start, end)
}

/// Extract `[start, end)` as a standalone value without a selection.
pub fn slice(value: &FormattedValue, start: usize, end: usize) -> FormattedValue {
    let (start, end, _) = value.clamp_range(start, end);
    let byte_start = value.byte_offset(start);
    let byte_end = value.byte_offset(end);
    FormattedValue {
        text: value.text[byte_start..byte_end].to_string(),
        formats: value.formats[start..end].to_vec(),
        replacements: value.replacements[start..end].to_vec(),
        start: None,
        end: None,
        active_formats: None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
