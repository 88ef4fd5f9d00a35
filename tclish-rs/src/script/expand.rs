//! Word resolver.
//!
//! Turns one raw token into its runtime string:
//!
//! | Token        | Result                                                   |
//! |--------------|----------------------------------------------------------|
//! | `word`       | the word with backslash escapes decoded                  |
//! | `$name`      | the value of variable `name` (empty when unbound)        |
//! | `'text'`     | `text` with escapes decoded                              |
//! | `{text}`     | `text`, verbatim                                         |
//! | `[cmd]`      | the result of evaluating `cmd` in the current task       |
//! | `"text"`     | `text` with escapes, `$name`, `${name}` and `[cmd]` done |
//!
//! Command substitution recurses into the evaluator through
//! [`EvalContext`]; an `Error` or `ForcedReturn` from a nested command
//! aborts the whole token.

use super::scan::{self, escape_len, TokenKind};
use super::signal::Signal;
use super::stmt::Token;
use super::task::Task;
use super::value::unescape;

/// Callbacks the resolver needs from the evaluator.
pub trait EvalContext {
    /// Look a variable up: task frames first, then the persistent store.
    fn lookup_var(&self, task: &Task, name: &str) -> Option<String>;

    /// Evaluate the body of a `[...]` substitution against `task` without
    /// pushing a frame.
    fn substitute(&mut self, task: &mut Task, body: &str) -> Signal;
}

/// Resolve one token into a signal carrying its value.
pub fn resolve(token: Token<'_>, task: &mut Task, ctx: &mut dyn EvalContext) -> Signal {
    match token.kind {
        TokenKind::Bare => match token.text.strip_prefix('$') {
            Some(name) if !name.is_empty() => {
                Signal::Normal(ctx.lookup_var(task, name).unwrap_or_default())
            }
            _ => Signal::Normal(unescape(token.text)),
        },
        TokenKind::Single => Signal::Normal(unescape(scan::inner(token.text))),
        TokenKind::Brace => Signal::ok(scan::inner(token.text)),
        TokenKind::Bracket => ctx.substitute(task, scan::inner(token.text)),
        TokenKind::Double => interpolate(scan::inner(token.text), task, ctx),
    }
}

/// Expand the body of a double-quoted token.
pub fn interpolate(body: &str, task: &mut Task, ctx: &mut dyn EvalContext) -> Signal {
    let bytes = body.as_bytes();
    let mut out = String::with_capacity(body.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                let n = escape_len(body, i);
                out.push_str(&unescape(&body[i..i + n]));
                i += n;
            }
            b'$' => match read_var_name(body, i + 1) {
                Some((name, next)) => {
                    out.push_str(&ctx.lookup_var(task, name).unwrap_or_default());
                    i = next;
                }
                None => {
                    out.push('$');
                    i += 1;
                }
            },
            b'[' => {
                let end = match scan::scan(body, i) {
                    Ok(end) => end,
                    Err(e) => return task.error(e.to_string(), "resolve"),
                };
                let sig = ctx.substitute(task, scan::inner(&body[i..end]));
                if sig.is_abort() {
                    return sig;
                }
                out.push_str(sig.payload());
                i = end;
            }
            _ => {
                let run = body[i..]
                    .find(['\\', '$', '['])
                    .map_or(body.len(), |n| i + n);
                out.push_str(&body[i..run]);
                i = run;
            }
        }
    }
    Signal::Normal(out)
}

/// Read a variable name starting at `pos`: either `{any text}` or a run of
/// alphanumerics, `-` and `_`.  Returns the name and the offset after it.
pub fn read_var_name(s: &str, pos: usize) -> Option<(&str, usize)> {
    let rest = s.get(pos..)?;
    if let Some(braced) = rest.strip_prefix('{') {
        let close = braced.find(['\\', '{', '}'])?;
        if braced.as_bytes()[close] != b'}' {
            return None;
        }
        return Some((&braced[..close], pos + 1 + close + 1));
    }
    let len = rest
        .char_indices()
        .find(|&(_, c)| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .map_or(rest.len(), |(n, _)| n);
    if len == 0 {
        return None;
    }
    Some((&rest[..len], pos + len))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
