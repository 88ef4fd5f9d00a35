//! String commands.  Lengths and indices count characters, not bytes.

use super::builtins::{arg, Builtin, CommandRegistry, RegistryError};
use super::interp::Interpreter;
use super::signal::Signal;
use super::task::Task;
use super::value::{self, bool_str, pack, Number};
use crate::pattern::{Pattern, PatternError};

fn len(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Signal {
    Signal::ok(arg(args, 0).chars().count().to_string())
}

fn strip(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Signal {
    Signal::ok(arg(args, 0).trim())
}

fn lower(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Signal {
    Signal::ok(arg(args, 0).to_lowercase())
}

fn upper(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Signal {
    Signal::ok(arg(args, 0).to_uppercase())
}

fn split(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    match args {
        [_, sep, ..] if sep.is_empty() => task.error("empty separator", "split"),
        [text, sep, ..] => Signal::ok(pack(text.split(sep.as_str()))),
        _ => task.error(
            "split requires a string to split, and a string to split it by",
            "split",
        ),
    }
}

fn join(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Signal {
    Signal::ok(args.concat())
}

fn chars(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    match args.first() {
        Some(s) => Signal::ok(pack(s.chars().map(String::from))),
        None => task.error("needs a string to split", "chars"),
    }
}

fn escape(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Signal {
    Signal::ok(value::escape(arg(args, 0)))
}

/// `sub <string> [<start>] [<stop>]`: 1-based, both ends inclusive.
fn sub(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    let Some(text) = args.first() else {
        return task.error("sub requires a string, a start index and a stop index", "sub");
    };
    let index = |i: usize, what: &str| match args.get(i) {
        None => Ok(1),
        Some(a) => Number::parse(a)
            .and_then(Number::as_integer)
            .ok_or_else(|| task.error(format!("{what} index must be a valid integer"), "sub")),
    };
    let (start, stop) = match index(1, "start").and_then(|s| index(2, "stop").map(|e| (s, e))) {
        Ok(bounds) => bounds,
        Err(sig) => return sig,
    };
    let chars: Vec<char> = text.chars().collect();
    let range = value::slice_range(chars.len(), start - 1, stop);
    Signal::ok(chars[range].iter().collect::<String>())
}

fn compile(task: &Task, pattern: Result<Pattern, PatternError>, label: &str) -> Result<Pattern, Signal> {
    pattern.map_err(|e| task.error(e.to_string(), label))
}

/// `regex-match <pattern> <string> [<code>]`.  With a code body, each match
/// is bound to `match` and the body's results are collected instead.
fn regex_match(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    if args.len() < 2 {
        return task.error("regex-match requires a pattern and at least a string", "regex-match");
    }
    let re = match compile(task, Pattern::regex(&args[0]), "regex-match") {
        Ok(re) => re,
        Err(sig) => return sig,
    };
    let matches = re.find_all(&args[1]);
    let Some(body) = args.get(2) else {
        return Signal::ok(pack(matches));
    };
    let mut results = Vec::with_capacity(matches.len());
    for m in matches {
        task.set("match", m);
        let sig = interp.simple_evaluate(task, body);
        if sig.is_abort() {
            return sig;
        }
        results.push(sig.into_payload());
    }
    Signal::ok(pack(results))
}

fn regex_test(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    if args.len() < 2 {
        return task.error("regex-test requires a pattern and a string", "regex-test");
    }
    match compile(task, Pattern::regex(&args[0]), "regex-test") {
        Ok(re) => Signal::ok(bool_str(re.matches_at_start(&args[1]))),
        Err(sig) => sig,
    }
}

fn glob(task: &Task, args: &[String], label: &str) -> Result<bool, Signal> {
    if args.len() < 2 {
        return Err(task.error(format!("{label} requires a pattern and at least a string"), label));
    }
    compile(task, Pattern::glob(&args[0]), label).map(|p| p.is_match(&args[1]))
}

fn glob_match(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    match glob(task, args, "glob-match") {
        Ok(true) => Signal::ok(args[1].as_str()),
        Ok(false) => Signal::empty(),
        Err(sig) => sig,
    }
}

fn glob_test(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    match glob(task, args, "glob-test") {
        Ok(matched) => Signal::ok(bool_str(matched)),
        Err(sig) => sig,
    }
}

fn uuid(_: &mut Interpreter, _: &mut Task, _: &[String]) -> Signal {
    Signal::ok(uuid::Uuid::new_v4().to_string())
}

const COMMANDS: &[(&str, Builtin, &str)] = &[
    ("len", len, "usage:\n  len <string>\nreturn the number of characters in <string>."),
    ("strip", strip, "usage:\n  strip <string>\nreturn <string> without leading and trailing whitespace."),
    ("lower", lower, "usage:\n  lower <string>\nreturn <string> in lowercase."),
    ("upper", upper, "usage:\n  upper <string>\nreturn <string> in uppercase."),
    ("split", split, "usage:\n  split <string> <separator>\nsplit <string> on <separator> and return the pieces as a list."),
    ("join", join, "usage:\n  join <string>...\nconcatenate the strings."),
    ("chars", chars, "usage:\n  chars <string>\nreturn the characters of <string> as a list."),
    ("escape", escape, "usage:\n  escape <string>\nescape backslashes and quoting characters."),
    ("sub", sub, "usage:\n  sub <string> [<start>] [<stop>]\nreturn the characters from <start> to <stop>, 1-based and inclusive."),
    ("regex-match", regex_match, "usage:\n  regex-match <pattern> <string> [<code>]\nreturn the list of matches of <pattern> in <string>.\nwith <code>, run it once per match with $match bound and return its results."),
    ("regex-test", regex_test, "usage:\n  regex-test <pattern> <string>\ntrue if <pattern> matches at the start of <string>."),
    ("glob-match", glob_match, "usage:\n  glob-match <pattern> <string>\nreturn <string> if the glob <pattern> matches it, else an empty string."),
    ("glob-test", glob_test, "usage:\n  glob-test <pattern> <string>\ntrue if the glob <pattern> matches <string>."),
    ("uuid", uuid, "usage:\n  uuid\nreturn a random uuid in string form."),
];

pub fn register(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.add_table(COMMANDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str) -> Signal {
        let mut interp = Interpreter::new();
        let mut task = Task::default();
        interp.evaluate(&mut task, src, Vec::new(), None)
    }

    fn ok(src: &str) -> String {
        match eval(src) {
            Signal::Normal(v) => v,
            other => panic!("{src:?} gave {other:?}"),
        }
    }

    #[test]
    fn case_and_length() {
        assert_eq!(ok("len héllo"), "5");
        assert_eq!(ok("len"), "0");
        assert_eq!(ok("upper abc"), "ABC");
        assert_eq!(ok("lower ABC"), "abc");
        assert_eq!(ok("strip '  x  '"), "x");
    }

    #[test]
    fn split_and_join() {
        assert_eq!(ok("split a,b,,c ,"), "{'a''b''''c'}");
        assert!(eval("split abc").is_error());
        assert!(eval("split abc {}").is_error());
        assert_eq!(ok("join a b c"), "abc");
    }

    #[test]
    fn uuids_are_fresh_v4_strings() {
        let a = ok("uuid");
        let b = ok("uuid");
        assert_ne!(a, b);
        let parsed = uuid::Uuid::parse_str(&a).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn chars_and_escape() {
        assert_eq!(ok("chars \"ab'\""), "{'a''b''\\''}");
        assert_eq!(ok("escape {a'b}"), "a\\'b");
    }

    #[test]
    fn substrings() {
        assert_eq!(ok("sub abcdef 2 4"), "bcd");
        assert_eq!(ok("sub abcdef"), "a");
        assert_eq!(ok("sub abcdef 3 99"), "cdef");
        assert_eq!(ok("sub héllo 2 2"), "é");
        assert!(eval("sub abc x").is_error());
    }

    #[test]
    fn regex_match_lists_matches() {
        assert_eq!(ok(r"regex-match {\d+} {a1 b22}"), "{'1''22'}");
        assert_eq!(ok(r"regex-match {x} {abc}"), "{}");
    }

    #[test]
    fn regex_match_runs_body_per_match() {
        let src = r"regex-match {\d+} {a1 b22} {join < $match >}";
        assert_eq!(ok(src), "{'<1>''<22>'}");
    }

    #[test]
    fn regex_errors() {
        assert!(eval("regex-match ( x").is_error());
        assert!(eval("regex-test x").is_error());
    }

    #[test]
    fn regex_test_anchors_at_start() {
        assert_eq!(ok("regex-test abc abcdef"), "true");
        assert_eq!(ok("regex-test bcd abcdef"), "");
    }

    #[test]
    fn globs() {
        assert_eq!(ok("glob-match abc* abcdef"), "abcdef");
        assert_eq!(ok("glob-match abc* xabc"), "");
        assert_eq!(ok("glob-test {a?c} abc"), "true");
        assert_eq!(ok("glob-test {a?c} abbc"), "");
    }
}
