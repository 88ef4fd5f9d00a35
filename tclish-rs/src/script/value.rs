//! String values and their encodings.
//!
//! Every tclish value is a `String`.  This module holds the codecs layered
//! on top of that: backslash escaping, the canonical list wire format
//! (`{'a''b c'}`), truthiness, and numeric coercion for the math library.

use std::cmp::Ordering;
use std::fmt;

use super::scan::{self, escape_len, is_structural, is_whitespace, TokenKind};

// ── Escaping ──────────────────────────────────────────────────────────────────

/// Escape backslashes and every structural character.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if ch == '\\' || (ch.is_ascii() && is_structural(ch as u8)) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Decode backslash escapes.
///
/// `\n \t \b \r` map to control characters, `\xHH` and `\uH...` to the
/// character with that code point, and any other escaped character stands
/// for itself.  A lone trailing backslash is kept.
pub fn unescape(s: &str) -> String {
    if !s.contains('\\') {
        return s.to_owned();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(at) = rest.find('\\') {
        out.push_str(&rest[..at]);
        let len = escape_len(rest, at);
        if len == 1 {
            out.push('\\');
            rest = &rest[at + 1..];
            continue;
        }
        let seq = &rest[at + 1..at + len];
        match seq.as_bytes()[0] {
            b'n' => out.push('\n'),
            b't' => out.push('\t'),
            b'b' => out.push('\u{8}'),
            b'r' => out.push('\r'),
            b'x' | b'u' if seq.len() > 1 => {
                let code = u32::from_str_radix(&seq[1..], 16).ok();
                out.push(code.and_then(char::from_u32).unwrap_or('\u{fffd}'));
            }
            _ => out.push_str(seq),
        }
        rest = &rest[at + len..];
    }
    out.push_str(rest);
    out
}

// ── List wire format ──────────────────────────────────────────────────────────

fn escape_element(s: &str, out: &mut String) {
    for ch in s.chars() {
        if ch == '\\' || ch == '\'' {
            out.push('\\');
        }
        out.push(ch);
    }
}

/// Encode a sequence of strings in the canonical list format.
pub fn pack<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::from("{");
    for item in items {
        out.push('\'');
        escape_element(item.as_ref(), &mut out);
        out.push('\'');
    }
    out.push('}');
    out
}

/// Decode a list.  Never fails: unquoted words become elements as written,
/// and content the scanner rejects becomes one final literal element.
pub fn unpack(s: &str) -> Vec<String> {
    let body = match s.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        Some(body) => body,
        None if s == "{" => "",
        None => s,
    };
    let mut items = Vec::new();
    let mut pos = 0;
    loop {
        (pos, _) = scan::skip_whitespace(body, pos);
        if pos >= body.len() {
            break;
        }
        let end = match scan::scan(body, pos) {
            Ok(end) if end > pos => end,
            _ => {
                items.push(body[pos..].to_owned());
                break;
            }
        };
        let word = &body[pos..end];
        if TokenKind::classify(word) == TokenKind::Single && word.len() >= 2 && word.ends_with('\'') {
            items.push(unescape(&word[1..word.len() - 1]));
        } else {
            items.push(word.to_owned());
        }
        pos = end;
    }
    items
}

// ── Truthiness and names ──────────────────────────────────────────────────────

/// The empty string is false; everything else is true.
pub fn is_true(s: &str) -> bool {
    !s.is_empty()
}

/// Render a boolean the way the language does: `"true"` or `""`.
pub fn bool_str(b: bool) -> String {
    if b {
        "true".into()
    } else {
        String::new()
    }
}

/// True when `s` could be written as a bare command name.
pub fn is_command_name(s: &str) -> bool {
    !s.is_empty()
        && !s
            .bytes()
            .any(|b| is_whitespace(b) || is_structural(b))
}

/// Clamp a half-open `[start, stop)` window onto a sequence of `len`
/// items.  Negative bounds count from the end.
pub fn slice_range(len: usize, start: i64, stop: i64) -> std::ops::Range<usize> {
    let clamp = |i: i64| -> usize {
        let i = if i < 0 { i + len as i64 } else { i };
        i.clamp(0, len as i64) as usize
    };
    let (start, stop) = (clamp(start), clamp(stop));
    start..stop.max(start)
}

// ── Numbers ───────────────────────────────────────────────────────────────────

/// A numeric reading of a string value.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Parse an integer first, then a float.  Surrounding whitespace is
    /// ignored.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(n) = s.parse::<i64>() {
            return Some(Number::Int(n));
        }
        s.parse::<f64>().ok().map(Number::Float)
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(x) => x,
        }
    }

    /// An integral value, if the number has one.
    pub fn as_integer(self) -> Option<i64> {
        match self {
            Number::Int(n) => Some(n),
            Number::Float(x) if x.fract() == 0.0 && x.abs() < i64::MAX as f64 => Some(x as i64),
            Number::Float(_) => None,
        }
    }

    pub fn is_integral(self) -> bool {
        match self {
            Number::Int(_) => true,
            Number::Float(x) => x.is_finite() && x.fract() == 0.0,
        }
    }

    fn combine(
        self,
        rhs: Number,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Number {
        if let (Number::Int(a), Number::Int(b)) = (self, rhs) {
            if let Some(n) = int_op(a, b) {
                return Number::Int(n);
            }
        }
        Number::Float(float_op(self.as_f64(), rhs.as_f64()))
    }

    pub fn add(self, rhs: Number) -> Number {
        self.combine(rhs, i64::checked_add, |a, b| a + b)
    }

    pub fn sub(self, rhs: Number) -> Number {
        self.combine(rhs, i64::checked_sub, |a, b| a - b)
    }

    pub fn mul(self, rhs: Number) -> Number {
        self.combine(rhs, i64::checked_mul, |a, b| a * b)
    }

    /// True division; the result is always a float.
    pub fn div(self, rhs: Number) -> Result<Number, String> {
        if rhs.as_f64() == 0.0 {
            return Err("division by zero".into());
        }
        Ok(Number::Float(self.as_f64() / rhs.as_f64()))
    }

    /// Modulo whose result takes the sign of the divisor.
    pub fn rem(self, rhs: Number) -> Result<Number, String> {
        if rhs.as_f64() == 0.0 {
            return Err("modulo by zero".into());
        }
        if let (Number::Int(a), Number::Int(b)) = (self, rhs) {
            if let Some(r) = a.checked_rem(b) {
                let r = if r != 0 && (r < 0) != (b < 0) { r + b } else { r };
                return Ok(Number::Int(r));
            }
        }
        let (a, b) = (self.as_f64(), rhs.as_f64());
        let r = a % b;
        Ok(Number::Float(if r != 0.0 && (r < 0.0) != (b < 0.0) {
            r + b
        } else {
            r
        }))
    }

    pub fn neg(self) -> Number {
        match self {
            Number::Int(n) => n
                .checked_neg()
                .map_or(Number::Float(-(n as f64)), Number::Int),
            Number::Float(x) => Number::Float(-x),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

impl fmt::Display for Number {
    /// Integral floats print without a fractional part.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{n}"),
            Number::Float(x) if *x == 0.0 => write!(f, "0"),
            Number::Float(x) if x.is_nan() => write!(f, "nan"),
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_structural_and_backslash() {
        assert_eq!(escape(r#"a[b]{c}'d"e\f"#), r#"a\[b\]\{c\}\'d\"e\\f"#);
    }

    #[test]
    fn unescape_named_escapes() {
        assert_eq!(unescape(r"a\nb\tc\rd\be"), "a\nb\tc\rd\u{8}e");
    }

    #[test]
    fn unescape_hex() {
        assert_eq!(unescape(r"\x41\x62"), "Ab");
        assert_eq!(unescape(r"\xZ1"), "xZ1");
    }

    #[test]
    fn unescape_unicode_run() {
        assert_eq!(unescape(r"\u00e9!"), "é!");
        assert_eq!(unescape(r"\u!"), "u!");
    }

    #[test]
    fn unescape_other_and_trailing() {
        assert_eq!(unescape(r"\q\\\'"), r"q\'");
        assert_eq!(unescape("end\\"), "end\\");
    }

    #[test]
    fn escape_round_trip() {
        let s = r#"[x] {y} 'z' "w" \ \n"#;
        assert_eq!(unescape(&escape(s)), s);
    }

    #[test]
    fn pack_format() {
        assert_eq!(pack(["a", "b c"]), "{'a''b c'}");
        assert_eq!(pack(Vec::<String>::new()), "{}");
        assert_eq!(pack(["it's", r"a\b"]), r"{'it\'s''a\\b'}");
    }

    #[test]
    fn unpack_quoted() {
        assert_eq!(unpack("{'a''b c'}"), vec!["a", "b c"]);
        assert_eq!(unpack("{'''x'}"), vec!["", "x"]);
    }

    #[test]
    fn unpack_bare_words() {
        assert_eq!(unpack("a b  c"), vec!["a", "b", "c"]);
        assert_eq!(unpack("{1 2 3}"), vec!["1", "2", "3"]);
    }

    #[test]
    fn unpack_empty() {
        assert!(unpack("{}").is_empty());
        assert!(unpack("").is_empty());
        assert!(unpack("{  }").is_empty());
    }

    #[test]
    fn unpack_leftover_is_literal() {
        assert_eq!(unpack("{'a' } z}"), vec!["a", "} z"]);
    }

    #[test]
    fn list_round_trip() {
        let items = vec!["", "a b", "it's", r"back\slash", "{", "]", "\"q\""];
        assert_eq!(unpack(&pack(&items)), items);
    }

    #[test]
    fn truthiness() {
        assert!(is_true("0"));
        assert!(is_true("false"));
        assert!(!is_true(""));
        assert_eq!(bool_str(true), "true");
        assert_eq!(bool_str(false), "");
    }

    #[test]
    fn command_names() {
        assert!(is_command_name("print"));
        assert!(is_command_name("regex-match"));
        assert!(!is_command_name("print x"));
        assert!(!is_command_name("a[b]"));
        assert!(!is_command_name(""));
    }

    #[test]
    fn slices_clamp() {
        assert_eq!(slice_range(5, 0, 3), 0..3);
        assert_eq!(slice_range(5, 2, 99), 2..5);
        assert_eq!(slice_range(5, -2, 5), 3..5);
        assert_eq!(slice_range(5, 4, 1), 4..4);
        assert_eq!(slice_range(0, 0, 1), 0..0);
    }

    #[test]
    fn number_parse_and_display() {
        assert_eq!(Number::parse(" 42 ").map(|n| n.to_string()), Some("42".into()));
        assert_eq!(Number::parse("2.5").map(|n| n.to_string()), Some("2.5".into()));
        assert_eq!(Number::Float(3.0).to_string(), "3");
        assert_eq!(Number::Float(-0.0).to_string(), "0");
        assert!(Number::parse("abc").is_none());
    }

    #[test]
    fn number_arithmetic() {
        let (a, b) = (Number::Int(7), Number::Int(2));
        assert_eq!(a.add(b).to_string(), "9");
        assert_eq!(a.sub(b).to_string(), "5");
        assert_eq!(a.mul(b).to_string(), "14");
        assert_eq!(a.div(b).unwrap().to_string(), "3.5");
        assert_eq!(Number::Int(6).div(b).unwrap().to_string(), "3");
    }

    #[test]
    fn number_rem_takes_divisor_sign() {
        assert_eq!(Number::Int(-7).rem(Number::Int(3)).unwrap().to_string(), "2");
        assert_eq!(Number::Int(7).rem(Number::Int(-3)).unwrap().to_string(), "-2");
        assert_eq!(Number::Float(5.5).rem(Number::Int(2)).unwrap().to_string(), "1.5");
    }

    #[test]
    fn number_division_by_zero() {
        assert!(Number::Int(1).div(Number::Int(0)).is_err());
        assert!(Number::Int(1).rem(Number::Float(0.0)).is_err());
    }

    #[test]
    fn number_overflow_promotes() {
        let big = Number::Int(i64::MAX).add(Number::Int(1));
        assert!(matches!(big, Number::Float(_)));
    }

    #[test]
    fn number_ordering() {
        assert!(Number::Int(2) < Number::Float(2.5));
        assert_eq!(Number::Int(3), Number::Float(3.0));
        assert_eq!(Number::parse("3").unwrap().as_integer(), Some(3));
        assert_eq!(Number::Float(3.5).as_integer(), None);
    }
}
