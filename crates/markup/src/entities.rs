//! Character reference decoding and escaping.

/// Decode the character reference starting at `&`, without the leading `&`.
///
/// `rest` is the input following the ampersand. Returns the decoded
/// character and the number of bytes consumed (including the trailing
/// `;`), or `None` when the reference is not recognized and the `&`
/// should stay literal.
pub fn decode_reference(rest: &str) -> Option<(char, usize)> {
    let end = rest.find(';')?;
    // References longer than this are not worth scanning for.
    if end == 0 || end > 10 {
        return None;
    }
    let name = &rest[..end];
    let consumed = end + 1;

    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok()?
            } else {
                return None;
            };
            char::from_u32(code)?
        }
    };

    Some((ch, consumed))
}

/// Decode all recognized character references in `input`.
pub fn decode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        match decode_reference(after) {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &after[consumed..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escape text content for serialization.
///
/// Escapes `&`, `<`, `>` and U+00A0 (as `&nbsp;`, so non-breaking spaces
/// survive whitespace-collapsing consumers).
pub fn escape_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape an attribute value for serialization inside double quotes.
pub fn escape_attribute(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            _ => out.push(ch),
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────
