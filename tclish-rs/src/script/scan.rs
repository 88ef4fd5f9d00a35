//! Quoting scanner.
//!
//! Given program text and a byte offset pointing at a non-whitespace
//! character, [`scan`] returns the exclusive end offset of the lexical unit
//! that starts there.  Nothing is evaluated or decoded; the only output is a
//! span.
//!
//! | First byte | Unit              | Ends at                                   |
//! |------------|-------------------|-------------------------------------------|
//! | `'`        | single-quoted     | next unescaped `'`                        |
//! | `"`        | double-quoted     | next unescaped `"`, skipping `[..]` units |
//! | `[`        | bracket command   | top-level `]` after a nested word scan    |
//! | `{`        | brace literal     | matching `}` by pure counting             |
//! | other      | bare word         | whitespace or a structural byte           |
//!
//! Running off the end of the text inside an open construct is not an error:
//! the span simply ends at the end of the text.  A close brace or bracket
//! with nothing open is an error, except that a stray `}` between the words
//! of a bracket command is logged and skipped.  Brackets nested deeper than
//! [`MAX_SCAN_DEPTH`] are an error.
//!
//! All structural characters are ASCII, so scanning bytes never splits a
//! UTF-8 sequence; escapes skip whole characters.

use thiserror::Error;
use tracing::warn;

/// Deepest `[..]` nesting the scanner follows.
pub const MAX_SCAN_DEPTH: usize = 1024;

/// Bytes that separate words.
pub const WHITESPACE: &[u8] = b"\t\n\x0b\x0c\r ";

/// Bytes that open or close a quoting construct.
pub const STRUCTURAL: &[u8] = b"[]{}'\"";

pub fn is_whitespace(b: u8) -> bool {
    WHITESPACE.contains(&b)
}

pub fn is_structural(b: u8) -> bool {
    STRUCTURAL.contains(&b)
}

/// Lexical classification of a raw token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Bare,
    Single,
    Double,
    Bracket,
    Brace,
}

impl TokenKind {
    /// Classify a token by its first byte.
    pub fn classify(token: &str) -> Self {
        match token.as_bytes().first() {
            Some(b'\'') => TokenKind::Single,
            Some(b'"') => TokenKind::Double,
            Some(b'[') => TokenKind::Bracket,
            Some(b'{') => TokenKind::Brace,
            _ => TokenKind::Bare,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("trailing close brace near <{near}>")]
    TrailingBrace { pos: usize, near: String },
    #[error("trailing close bracket near <{near}>")]
    TrailingBracket { pos: usize, near: String },
    #[error("scan position {pos} is past the end of the text")]
    PastEnd { pos: usize },
    #[error("commands nested too deeply near <{near}>")]
    TooDeep { pos: usize, near: String },
}

/// A few characters either side of `pos`, for error messages.
fn near(text: &str, pos: usize) -> String {
    let mut start = pos.saturating_sub(3);
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (pos + 4).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    text[start..end].to_owned()
}

/// Skip whitespace from `pos`.  Returns the new offset and whether a newline
/// was crossed.
pub fn skip_whitespace(text: &str, pos: usize) -> (usize, bool) {
    let bytes = text.as_bytes();
    let mut i = pos;
    let mut newline = false;
    while i < bytes.len() && is_whitespace(bytes[i]) {
        newline |= bytes[i] == b'\n';
        i += 1;
    }
    (i, newline)
}

/// Length in bytes of the escape sequence starting with the `\` at `pos`.
///
/// `\xHH` is four bytes when both digits are hex, `\u` swallows every hex
/// digit that follows it, and anything else is the backslash plus one whole
/// character.  A backslash at the very end of the text has length one.
pub fn escape_len(text: &str, pos: usize) -> usize {
    let bytes = text.as_bytes();
    let Some(&next) = bytes.get(pos + 1) else {
        return 1;
    };
    match next {
        b'x' => {
            let hex = bytes[pos + 2..]
                .iter()
                .take(2)
                .take_while(|b| b.is_ascii_hexdigit())
                .count();
            if hex == 2 {
                4
            } else {
                2
            }
        }
        b'u' => {
            let hex = bytes[pos + 2..]
                .iter()
                .take_while(|b| b.is_ascii_hexdigit())
                .count();
            2 + hex
        }
        _ => {
            let ch = text[pos + 1..].chars().next().map_or(1, char::len_utf8);
            1 + ch
        }
    }
}

/// Find the exclusive end of the lexical unit starting at `pos`.
pub fn scan(text: &str, pos: usize) -> Result<usize, ScanError> {
    scan_at(text, pos, 0)
}

fn scan_at(text: &str, pos: usize, depth: usize) -> Result<usize, ScanError> {
    let bytes = text.as_bytes();
    let Some(&first) = bytes.get(pos) else {
        return Err(ScanError::PastEnd { pos });
    };
    match first {
        b'\'' => Ok(scan_single(bytes, pos)),
        b'"' => scan_double(text, pos, depth),
        b'[' => scan_bracket(text, pos, depth),
        b'{' => Ok(scan_brace(bytes, pos)),
        b'}' => Err(ScanError::TrailingBrace {
            pos,
            near: near(text, pos),
        }),
        b']' => Err(ScanError::TrailingBracket {
            pos,
            near: near(text, pos),
        }),
        _ => Ok(scan_bare(bytes, pos)),
    }
}

fn scan_bare(bytes: &[u8], pos: usize) -> usize {
    let mut i = pos;
    while i < bytes.len() && !is_whitespace(bytes[i]) && !is_structural(bytes[i]) {
        i += 1;
    }
    i
}

fn scan_single(bytes: &[u8], pos: usize) -> usize {
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(pos + 1) {
        if escaped {
            escaped = false;
        } else if b == b'\\' {
            escaped = true;
        } else if b == b'\'' {
            return i + 1;
        }
    }
    bytes.len()
}

fn scan_double(text: &str, pos: usize, depth: usize) -> Result<usize, ScanError> {
    let bytes = text.as_bytes();
    let mut i = pos + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => return Ok(i + 1),
            b'\\' => i += escape_len(text, i),
            b'[' => i = scan_bracket(text, i, depth)?,
            _ => i += 1,
        }
    }
    Ok(bytes.len())
}

fn scan_bracket(text: &str, pos: usize, depth: usize) -> Result<usize, ScanError> {
    if depth >= MAX_SCAN_DEPTH {
        return Err(ScanError::TooDeep {
            pos,
            near: near(text, pos),
        });
    }
    let bytes = text.as_bytes();
    let mut i = pos + 1;
    loop {
        (i, _) = skip_whitespace(text, i);
        match bytes.get(i) {
            None => return Ok(bytes.len()),
            Some(b']') => return Ok(i + 1),
            Some(b'}') => {
                warn!(near = %near(text, i), "skipping stray close brace in command");
                i += 1;
            }
            Some(_) => i = scan_at(text, i, depth + 1)?,
        }
    }
}

fn scan_brace(bytes: &[u8], pos: usize) -> usize {
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(pos) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
    }
    bytes.len()
}

/// Strip the opening delimiter of a quoted token, and the closing one if the
/// token was terminated.
pub fn inner(token: &str) -> &str {
    let close = match TokenKind::classify(token) {
        TokenKind::Single => '\'',
        TokenKind::Double => '"',
        TokenKind::Bracket => ']',
        TokenKind::Brace => '}',
        TokenKind::Bare => return token,
    };
    let body = &token[1..];
    body.strip_suffix(close).unwrap_or(body)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
