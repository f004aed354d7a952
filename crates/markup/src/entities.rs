//! Markup entity handling for attribute values.
//!
//! Unescaping is deliberately narrow: the five XML entities plus `&nbsp;`,
//! and semicolon-terminated decimal/hex character references. Anything else,
//! including unknown names, missing semicolons and invalid scalars, is kept
//! verbatim.

use std::borrow::Cow;

const NAMED: &[(&[u8], char)] = &[
    (b"&amp;", '&'),
    (b"&lt;", '<'),
    (b"&gt;", '>'),
    (b"&quot;", '"'),
    (b"&apos;", '\''),
    (b"&nbsp;", '\u{00A0}'),
];

const MAX_HEX_DIGITS: usize = 6;
const MAX_DEC_DIGITS: usize = 7;

pub fn unescape_markup(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    let Some(first) = memchr::memchr(b'&', bytes) else {
        return Cow::Borrowed(s);
    };
    let mut out = String::with_capacity(s.len());
    out.push_str(&s[..first]);
    let mut i = first;
    while i < bytes.len() {
        if bytes[i] != b'&' {
            let next = memchr::memchr(b'&', &bytes[i..]).map_or(bytes.len(), |rel| i + rel);
            out.push_str(&s[i..next]);
            i = next;
            continue;
        }
        match decode_reference(s, i) {
            Some((ch, consumed)) => {
                out.push(ch);
                i += consumed;
            }
            None => {
                out.push('&');
                i += 1;
            }
        }
    }
    Cow::Owned(out)
}

// Decodes the reference starting at the `&` at `at`, returning the character
// and the number of bytes it spans.
fn decode_reference(s: &str, at: usize) -> Option<(char, usize)> {
    let bytes = &s.as_bytes()[at..];
    for (pattern, ch) in NAMED {
        if bytes.starts_with(pattern) {
            return Some((*ch, pattern.len()));
        }
    }
    let (digits_start, radix, max_digits) = match bytes.get(1..3) {
        Some([b'#', b'x' | b'X']) => (3, 16, MAX_HEX_DIGITS),
        Some([b'#', _]) => (2, 10, MAX_DEC_DIGITS),
        _ => return None,
    };
    let digits = bytes[digits_start..]
        .iter()
        .take(max_digits + 1)
        .take_while(|b| char::from(**b).is_digit(radix))
        .count();
    if digits == 0 || digits > max_digits {
        return None;
    }
    let end = digits_start + digits;
    if bytes.get(end) != Some(&b';') {
        return None;
    }
    let text = &s[at + digits_start..at + end];
    u32::from_str_radix(text, radix)
        .ok()
        .and_then(char::from_u32)
        .map(|ch| (ch, end + 1))
}

/// Escapes the characters that cannot appear verbatim in a quoted attribute
/// value.
pub fn escape_markup(s: &str) -> Cow<'_, str> {
    if !s.bytes().any(|b| matches!(b, b'&' | b'<' | b'>' | b'"' | b'\'')) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}
