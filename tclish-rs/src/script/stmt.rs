//! Sentence splitter.
//!
//! A program is a sequence of sentences.  A sentence is the run of tokens up
//! to the next newline that falls *between* tokens (newlines inside quoted
//! or bracketed tokens do not count), or up to a standalone `;` token.
//! A lone `\` token continues the sentence onto the next line.
//!
//! Sentences whose first token starts with `#` are kept and flagged as
//! comments so the evaluator can give them comment semantics.

use super::scan::{self, ScanError, TokenKind};

/// One raw, unresolved token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub kind: TokenKind,
}

impl<'a> Token<'a> {
    pub fn new(text: &'a str) -> Self {
        Token {
            text,
            kind: TokenKind::classify(text),
        }
    }
}

/// An ordered run of tokens forming one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentence<'a> {
    pub tokens: Vec<Token<'a>>,
}

impl<'a> Sentence<'a> {
    pub fn is_comment(&self) -> bool {
        self.tokens
            .first()
            .is_some_and(|t| t.text.starts_with('#'))
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn words(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.tokens.iter().map(|t| t.text)
    }
}

/// Split `text` into sentences.  Blank sentences are dropped; comment
/// sentences are kept.
pub fn split(text: &str) -> Result<Vec<Sentence<'_>>, ScanError> {
    let mut sentences = Vec::new();
    let mut pos = 0;
    while pos < text.len() {
        let (sentence, next) = read_sentence(text, pos)?;
        pos = next;
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
    }
    Ok(sentences)
}

/// Read one sentence starting at `pos`.  Returns the sentence and the offset
/// just past it.
pub fn read_sentence(text: &str, pos: usize) -> Result<(Sentence<'_>, usize), ScanError> {
    let mut sentence = Sentence::default();
    let (mut pos, mut newline) = scan::skip_whitespace(text, pos);
    while !newline && pos < text.len() {
        let end = scan::scan(text, pos)?;
        let word = &text[pos..end];
        if word == ";" {
            return Ok((sentence, end));
        }
        (pos, newline) = scan::skip_whitespace(text, end);
        if word == "\\" {
            newline = false;
        } else {
            sentence.tokens.push(Token::new(word));
        }
    }
    Ok((sentence, pos))
}

/// Parameter names declared by a leading `args map a b ...` sentence, if the
/// body starts with one.
pub fn header(body: &str) -> Option<Vec<String>> {
    let (sentence, _) = read_sentence(body, 0).ok()?;
    let mut words = sentence.words();
    if words.next()? != "args" || words.next()? != "map" {
        return None;
    }
    Some(
        words
            .map(|w| match TokenKind::classify(w) {
                TokenKind::Single | TokenKind::Brace => scan::inner(w).to_owned(),
                _ => w.to_owned(),
            })
            .collect(),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<Vec<&str>> {
        split(text)
            .unwrap()
            .iter()
            .map(|s| s.words().collect())
            .collect()
    }

    #[test]
    fn newline_separates_sentences() {
        assert_eq!(words("a b\nc d"), vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn semicolon_token_separates() {
        assert_eq!(words("a ; b c"), vec![vec!["a"], vec!["b", "c"]]);
    }

    #[test]
    fn semicolon_inside_word_is_kept() {
        assert_eq!(words("a; b"), vec![vec!["a;", "b"]]);
    }

    #[test]
    fn backslash_continues_line() {
        assert_eq!(words("a \\\n  b\nc"), vec![vec!["a", "b"], vec!["c"]]);
    }

    #[test]
    fn newline_inside_brace_does_not_split() {
        assert_eq!(words("if {x} {\n  y\n}\nz"), vec![vec!["if", "{x}", "{\n  y\n}"], vec!["z"]]);
    }

    #[test]
    fn blank_lines_are_dropped() {
        assert_eq!(words("\n\n  a\n\n\nb\n"), vec![vec!["a"], vec!["b"]]);
    }

    #[test]
    fn comments_are_kept_and_flagged() {
        let sentences = split("# note here\nx").unwrap();
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].is_comment());
        assert!(!sentences[1].is_comment());
    }

    #[test]
    fn token_kinds() {
        let sentences = split("cmd 'a' \"b\" [c] {d} e").unwrap();
        let kinds: Vec<TokenKind> = sentences[0].tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [
                TokenKind::Bare,
                TokenKind::Single,
                TokenKind::Double,
                TokenKind::Bracket,
                TokenKind::Brace,
                TokenKind::Bare
            ]
        );
    }

    #[test]
    fn adjacent_quoted_tokens_split() {
        assert_eq!(words("args map 'a''b'"), vec![vec!["args", "map", "'a'", "'b'"]]);
    }

    #[test]
    fn trailing_brace_is_error() {
        assert!(split("a }").is_err());
    }

    #[test]
    fn header_reads_args_map() {
        assert_eq!(header("args map 'a' b\nbody"), Some(vec!["a".to_owned(), "b".to_owned()]));
        assert_eq!(header("print x"), None);
        assert_eq!(header(""), None);
    }
}
