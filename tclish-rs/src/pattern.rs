//! Pattern matching: regular expressions and shell-style globs.
//!
//! Both modes compile down to a [`regex::Regex`].  Globs follow the usual
//! shell file-name rules and must match the whole subject:
//!
//! | Glob      | Meaning                                  |
//! |-----------|------------------------------------------|
//! | `*`       | any run of characters, including none    |
//! | `?`       | exactly one character                    |
//! | `[abc]`   | one character from the set (ranges ok)   |
//! | `[!abc]`  | one character not in the set             |
//!
//! A `[` without a closing `]` is matched literally.

use std::sync::Arc;

use regex::Regex;
use thiserror::Error;

use crate::script::value::pack;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Regex,
    Glob,
}

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("error in regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),
}

/// A compiled pattern.
#[derive(Clone)]
pub struct Pattern {
    src: String,
    mode: MatchMode,
    re: Arc<Regex>,
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pattern")
            .field("src", &self.src)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Pattern {
    pub fn new(src: &str, mode: MatchMode) -> Result<Self, PatternError> {
        let re = match mode {
            MatchMode::Regex => Regex::new(src)?,
            MatchMode::Glob => Regex::new(&glob_to_regex(src))?,
        };
        Ok(Pattern {
            src: src.to_owned(),
            mode,
            re: Arc::new(re),
        })
    }

    pub fn regex(src: &str) -> Result<Self, PatternError> {
        Pattern::new(src, MatchMode::Regex)
    }

    pub fn glob(src: &str) -> Result<Self, PatternError> {
        Pattern::new(src, MatchMode::Glob)
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Regexes match anywhere; globs must cover the whole text.
    pub fn is_match(&self, text: &str) -> bool {
        self.re.is_match(text)
    }

    /// True when a match begins at the first character.
    pub fn matches_at_start(&self, text: &str) -> bool {
        self.re.find(text).is_some_and(|m| m.start() == 0)
    }

    /// Every non-overlapping match.  With no capture groups each item is
    /// the whole match; with one group it is that group; with several it is
    /// a list of the groups.
    pub fn find_all(&self, text: &str) -> Vec<String> {
        fn group<'h>(caps: &regex::Captures<'h>, i: usize) -> &'h str {
            caps.get(i).map_or("", |m| m.as_str())
        }

        let groups = self.re.captures_len() - 1;
        self.re
            .captures_iter(text)
            .map(|caps| match groups {
                0 => group(&caps, 0).to_owned(),
                1 => group(&caps, 1).to_owned(),
                n => pack((1..=n).map(|i| group(&caps, i))),
            })
            .collect()
    }
}

/// Translate a glob into an anchored regex.
pub fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::from(r"(?s)\A");
    let mut buf = [0u8; 4];
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '*' => {
                out.push_str(".*");
                while chars.get(i) == Some(&'*') {
                    i += 1;
                }
            }
            '?' => out.push('.'),
            '[' => {
                let mut j = i;
                if chars.get(j) == Some(&'!') {
                    j += 1;
                }
                if chars.get(j) == Some(&']') {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    out.push_str(r"\[");
                    continue;
                }
                let mut body = &chars[i..j];
                i = j + 1;
                out.push('[');
                if body.first() == Some(&'!') {
                    out.push('^');
                    body = &body[1..];
                }
                for &ch in body {
                    if matches!(ch, '\\' | '[' | ']' | '^' | '&' | '~') {
                        out.push('\\');
                    }
                    out.push(ch);
                }
                out.push(']');
            }
            c => out.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    out.push_str(r"\z");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glob(p: &str, s: &str) -> bool {
        Pattern::glob(p).unwrap().is_match(s)
    }

    #[test]
    fn glob_wildcards() {
        assert!(glob("abc*", "abcdef"));
        assert!(glob("*", ""));
        assert!(glob("a?c", "abc"));
        assert!(!glob("a?c", "ac"));
        assert!(!glob("abc", "abcd"));
        assert!(glob("*.rs", "dir/main.rs"));
    }

    #[test]
    fn glob_is_case_sensitive() {
        assert!(!glob("ABC", "abc"));
    }

    #[test]
    fn glob_classes() {
        assert!(glob("[abc]x", "bx"));
        assert!(!glob("[!abc]x", "bx"));
        assert!(glob("[a-c]", "b"));
        assert!(glob("[]]", "]"));
        assert!(glob("[", "["));
        assert!(glob("a[", "a["));
    }

    #[test]
    fn glob_escapes_regex_syntax() {
        assert!(glob("a.b+(c)", "a.b+(c)"));
        assert!(!glob("a.b", "axb"));
        assert!(glob("x\ny", "x\ny"));
    }

    #[test]
    fn regex_find_all_follows_groups() {
        let re = Pattern::regex(r"\d+").unwrap();
        assert_eq!(re.find_all("a1 b22 c333"), ["1", "22", "333"]);
        let re = Pattern::regex(r"(\w)=\d").unwrap();
        assert_eq!(re.find_all("a=1 b=2"), ["a", "b"]);
        let re = Pattern::regex(r"(\w)=(\d)").unwrap();
        assert_eq!(re.find_all("a=1 b=2"), ["{'a''1'}", "{'b''2'}"]);
        let re = Pattern::regex(r"(x)|(y)").unwrap();
        assert_eq!(re.find_all("y"), ["{'''y'}"]);
    }

    #[test]
    fn regex_anchoring() {
        let re = Pattern::regex("abc").unwrap();
        assert!(re.is_match("xabc"));
        assert!(!re.matches_at_start("xabc"));
        assert!(re.matches_at_start("abcx"));
    }

    #[test]
    fn invalid_regex_is_an_error() {
        let err = Pattern::regex("(").unwrap_err();
        assert!(err.to_string().starts_with("error in regular expression"));
    }
}
