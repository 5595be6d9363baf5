//! Output sanitization
//!
//! Terminal output is full of escape sequences and, occasionally, bytes that
//! are not text at all. Everything here walks raw bytes and only appends
//! complete, valid characters, so a line containing garbage never turns into
//! replacement characters in a prompt, and removing a control byte can never
//! join two invalid fragments into a character.

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;

/// Marker prefixed to output that had to be cut to fit the byte budget
pub const TRUNCATION_MARKER: &str = "[truncated]\n";

/// Strip escape sequences and control bytes from a line of output
///
/// - CSI sequences (`ESC [` ... final byte `0x40..=0x7E`) are removed
/// - OSC sequences (`ESC ]` ... `BEL` or `ESC \`) are removed
/// - any other `ESC x` pair is removed
/// - `\r` becomes `\n`
/// - other C0 controls except tab and newline are dropped
/// - byte sequences that are not valid UTF-8 are dropped
#[must_use]
pub fn sanitize_line(input: &[u8]) -> String {
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        let byte = input[i];
        match byte {
            ESC => {
                i = skip_escape(input, i + 1);
                continue;
            }
            b'\r' => out.push('\n'),
            b'\t' | b'\n' => out.push(char::from(byte)),
            0x00..=0x1f => {}
            0x20..=0x7f => out.push(char::from(byte)),
            _ => {
                // Multi-byte characters must be complete and contiguous;
                // anything else is dropped one byte at a time.
                if let Some(ch) = decode_char(&input[i..]) {
                    out.push(ch);
                    i += ch.len_utf8();
                    continue;
                }
            }
        }
        i += 1;
    }

    out
}

/// [`sanitize_line`] for text that is already a `&str`
#[must_use]
pub fn strip_ansi(input: &str) -> String {
    sanitize_line(input.as_bytes())
}

/// The character encoded at the start of `bytes`, if it is valid UTF-8
fn decode_char(bytes: &[u8]) -> Option<char> {
    let width = match bytes.first()? {
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => return None,
    };
    let encoded = bytes.get(..width)?;
    std::str::from_utf8(encoded).ok()?.chars().next()
}

/// Returns the index just past the escape sequence whose introducer follows
/// the `ESC` at `start - 1`.
fn skip_escape(input: &[u8], start: usize) -> usize {
    match input.get(start) {
        None => start,
        Some(b'[') => {
            let mut i = start + 1;
            while let Some(&b) = input.get(i) {
                i += 1;
                if (0x40..=0x7e).contains(&b) {
                    break;
                }
            }
            i
        }
        Some(b']') => {
            let mut i = start + 1;
            while let Some(&b) = input.get(i) {
                if b == BEL {
                    return i + 1;
                }
                if b == ESC && input.get(i + 1) == Some(&b'\\') {
                    return i + 2;
                }
                i += 1;
            }
            i
        }
        Some(_) => start + 1,
    }
}

/// Keep the tail of `text` so the result is at most `max_bytes` long
///
/// Returns the text unchanged when it already fits. Otherwise the result is
/// [`TRUNCATION_MARKER`] followed by the most recent content, with the cut
/// moved forward to the next character boundary. When `max_bytes` cannot even
/// hold the marker, a prefix of the marker is returned.
#[must_use]
pub fn truncate_tail(text: &str, max_bytes: usize) -> (String, bool) {
    if text.len() <= max_bytes {
        return (text.to_string(), false);
    }
    if max_bytes < TRUNCATION_MARKER.len() {
        return (TRUNCATION_MARKER[..max_bytes].to_string(), true);
    }

    let keep = max_bytes - TRUNCATION_MARKER.len();
    let mut cut = text.len() - keep;
    while !text.is_char_boundary(cut) {
        cut += 1;
    }

    let mut out = String::with_capacity(max_bytes);
    out.push_str(TRUNCATION_MARKER);
    out.push_str(&text[cut..]);
    (out, true)
}
