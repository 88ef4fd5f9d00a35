//! The fixed primitive table.
//!
//! Primitives are looked up before every other namespace and cannot be
//! shadowed.  They are the only commands that work on an interpreter built
//! without any library.

use super::builtins::arg;
use super::interp::Interpreter;
use super::signal::Signal;
use super::task::Task;
use super::value::{self, pack, Number};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    If,
    Return,
    Error,
    Get,
    Set,
    Args,
    Defproc,
    True,
    False,
    Help,
}

impl Primitive {
    pub const ALL: [Primitive; 10] = [
        Primitive::If,
        Primitive::Return,
        Primitive::Error,
        Primitive::Get,
        Primitive::Set,
        Primitive::Args,
        Primitive::Defproc,
        Primitive::True,
        Primitive::False,
        Primitive::Help,
    ];

    pub fn from_name(name: &str) -> Option<Primitive> {
        Primitive::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::If => "if",
            Primitive::Return => "return",
            Primitive::Error => "error",
            Primitive::Get => "get",
            Primitive::Set => "set",
            Primitive::Args => "args",
            Primitive::Defproc => "defproc",
            Primitive::True => "true",
            Primitive::False => "false",
            Primitive::Help => "help",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Primitive::If => {
                "usage:\n  if <cond> <code> [elif <cond> <code>]... [else <code>]\n\
                 run the first <code> whose <cond> evaluates to a non-empty string."
            }
            Primitive::Return => "usage:\n  return [<value>]\nleave the current evaluation with <value>.",
            Primitive::Error => {
                "usage:\n  error [<message>...] [<label>]\nraise an error labelled <label>."
            }
            Primitive::Get => "usage:\n  get <name>\nreturn the value of variable <name>.",
            Primitive::Set => {
                "usage:\n  set <name> [<value>]\nbind <name> in the current scope, or unbind it when no value is given."
            }
            Primitive::Args => {
                "usage:\n  args <index>\n  args count\n  args list [<start>] [<stop>]\n  args map <name>...\n\
                 read the positional arguments of the current scope; indices start at 1."
            }
            Primitive::Defproc => {
                "usage:\n  defproc <name> <code> [<help>]\ndefine a command that evaluates <code> in a new scope."
            }
            Primitive::True => "usage:\n  true\nreturn \"true\".",
            Primitive::False => "usage:\n  false\nreturn an empty string.",
            Primitive::Help => {
                "usage:\n  help <topic>\n  help topics\n  help list topics\nshow help for a topic, or list the topics."
            }
        }
    }

    pub fn call(self, interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
        match self {
            Primitive::If => if_(interp, task, args),
            Primitive::Return => Signal::ForcedReturn(arg(args, 0).to_owned()),
            Primitive::Error => error(task, args),
            Primitive::Get => match args.first() {
                Some(name) => Signal::Normal(interp.get_value(task, name).unwrap_or_default()),
                None => task.error("get requires a variable name", "get"),
            },
            Primitive::Set => set(task, args),
            Primitive::Args => args_(task, args),
            Primitive::Defproc => match args {
                [name, body, rest @ ..] => {
                    interp.add_definition(name.as_str(), body.as_str(), rest.first().map_or("", String::as_str));
                    Signal::empty()
                }
                _ => task.error("defproc requires a name and a body", "defproc"),
            },
            Primitive::True => Signal::ok("true"),
            Primitive::False => Signal::empty(),
            Primitive::Help => help(interp, args),
        }
    }
}

fn if_(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    let mut i = 0;
    while i < args.len() {
        let (Some(cond), Some(body)) = (args.get(i), args.get(i + 1)) else {
            return task.error("a condition needs a body", "if");
        };
        let sig = interp.simple_evaluate(task, cond);
        if sig.is_abort() {
            return sig;
        }
        if value::is_true(sig.payload()) {
            return interp.simple_evaluate(task, body);
        }
        i += 2;
        // Skip to the next clause keyword.
        loop {
            let Some(word) = args.get(i) else {
                return Signal::empty();
            };
            i += 1;
            match word.to_ascii_lowercase().as_str() {
                "elif" | "elseif" => break,
                "else" => {
                    return match args.get(i) {
                        Some(body) => interp.simple_evaluate(task, body),
                        None => Signal::empty(),
                    };
                }
                _ => {}
            }
        }
    }
    Signal::empty()
}

fn error(task: &Task, args: &[String]) -> Signal {
    match args {
        [] => task.error("error", "error"),
        [msg] => task.error(msg, "error"),
        [msgs @ .., label] => task.error(msgs.join(" "), label),
    }
}

fn set(task: &mut Task, args: &[String]) -> Signal {
    match args {
        [] => task.error("set requires a variable name", "set"),
        [name] => {
            task.unset(name);
            Signal::empty()
        }
        [name, value, ..] => {
            task.set(name.as_str(), value.as_str());
            Signal::ok(value.as_str())
        }
    }
}

fn args_(task: &mut Task, args: &[String]) -> Signal {
    let positional = task.args();
    let Some(sub) = args.first() else {
        return Signal::ok(pack(positional));
    };
    match sub.as_str() {
        "count" => Signal::ok(positional.len().to_string()),
        "list" => {
            let bound = |i: usize, default: i64| {
                args.get(i)
                    .and_then(|a| Number::parse(a))
                    .and_then(Number::as_integer)
                    .unwrap_or(default)
            };
            let start = bound(1, 1);
            let stop = bound(2, positional.len() as i64 + 1);
            Signal::ok(pack(&positional[value::slice_range(positional.len(), start - 1, stop - 1)]))
        }
        "map" => map_args(task, &args[1..]),
        index => {
            let item = Number::parse(index)
                .and_then(Number::as_integer)
                .and_then(|n| usize::try_from(n - 1).ok())
                .and_then(|n| positional.get(n));
            Signal::ok(item.map_or("", String::as_str))
        }
    }
}

/// Bind positional arguments to `names`, in order.
fn map_args(task: &mut Task, names: &[String]) -> Signal {
    let positional = task.args().to_vec();
    for (i, name) in names.iter().enumerate() {
        let Some(value) = positional.get(i) else {
            return task.error(format!("argument <{name}> at pos {} is missing", i + 1), "args");
        };
        task.set(name.as_str(), value.as_str());
    }
    Signal::empty()
}

// ── help ──────────────────────────────────────────────────────────────────────

fn help(interp: &Interpreter, args: &[String]) -> Signal {
    let words: Vec<&str> = args.iter().map(String::as_str).collect();
    match words.as_slice() {
        [] => Signal::ok(Primitive::Help.help()),
        ["topics"] => Signal::ok(topics_text(interp)),
        ["list", "topics"] | ["topics", "list"] => {
            Signal::ok(pack(topic_groups(interp).into_iter().flat_map(|(_, names)| names)))
        }
        [topic, ..] => Signal::Normal(
            help_for(interp, topic)
                .unwrap_or_else(|| format!("helpstring for topic '{topic}' doesn't exist")),
        ),
    }
}

/// Help text for `topic`.  Handles shadow primitives so `help self` inside
/// a method describes the bound object.
pub fn help_for(interp: &Interpreter, topic: &str) -> Option<String> {
    interp
        .handle(topic)
        .map(|h| h.help.clone())
        .or_else(|| Primitive::from_name(topic).map(|p| p.help().to_owned()))
        .or_else(|| interp.definition(topic).map(|d| d.help.clone()))
        .or_else(|| interp.objects.help(topic))
        .or_else(|| interp.commands.help(topic).map(str::to_owned))
        .or_else(|| interp.helps.get(topic).cloned())
}

fn topic_groups(interp: &Interpreter) -> Vec<(&'static str, Vec<String>)> {
    let mut handles: Vec<String> = interp.handle_names().cloned().collect();
    handles.sort();
    vec![
        ("primitives", Primitive::ALL.iter().map(|p| p.name().to_owned()).collect()),
        ("commands", interp.commands.names().map(str::to_owned).collect()),
        ("procedures", interp.definitions().map(|(n, _)| n.clone()).collect()),
        ("classes", interp.objects.class_names()),
        ("handles", handles),
        ("topics", interp.helps.keys().cloned().collect()),
    ]
}

fn topics_text(interp: &Interpreter) -> String {
    let mut out = String::new();
    for (group, names) in topic_groups(interp) {
        if names.is_empty() {
            continue;
        }
        out.push_str(group);
        out.push_str(":\n");
        for name in names {
            out.push_str("  ");
            out.push_str(&name);
            out.push('\n');
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::interp::InterpConfig;

    fn bare() -> Interpreter {
        Interpreter::with_config(InterpConfig {
            load_stdlib: false,
            ..InterpConfig::default()
        })
    }

    fn eval_args(src: &str, args: &[&str]) -> Signal {
        let mut interp = bare();
        let mut task = Task::default();
        let args = args.iter().map(|a| a.to_string()).collect();
        interp.evaluate(&mut task, src, args, None)
    }

    fn eval(src: &str) -> Signal {
        eval_args(src, &[])
    }

    #[test]
    fn names_round_trip() {
        for p in Primitive::ALL {
            assert_eq!(Primitive::from_name(p.name()), Some(p));
        }
        assert_eq!(Primitive::from_name("print"), None);
    }

    #[test]
    fn if_chains() {
        assert_eq!(eval("if {true} {return a} else {return b}"), Signal::ok("a"));
        assert_eq!(eval("if {false} {return a} else {return b}"), Signal::ok("b"));
        assert_eq!(eval("if {false} {return a} elif {true} {return c}"), Signal::ok("c"));
        assert_eq!(eval("if {false} {return a} ELSEIF {true} {return c}"), Signal::ok("c"));
        assert_eq!(eval("if {false} {return a}"), Signal::ok(""));
    }

    #[test]
    fn if_skips_unknown_words_between_clauses() {
        assert_eq!(eval("if {false} {return a} then else {return b}"), Signal::ok("b"));
    }

    #[test]
    fn if_body_runs_in_current_frame() {
        assert_eq!(eval("if {true} {set x 9}\nget x"), Signal::ok("9"));
    }

    #[test]
    fn if_condition_error_propagates() {
        assert!(eval("if {error bad} {return a}").is_error());
    }

    #[test]
    fn error_forms() {
        let head = |src: &str| match eval(src) {
            Signal::Error(m) => m.lines().next().unwrap_or_default().to_owned(),
            other => panic!("{other:?}"),
        };
        assert_eq!(head("error"), "<error> error");
        assert_eq!(head("error oops"), "<error> oops");
        assert_eq!(head("error oops mine"), "<mine> oops");
        assert_eq!(head("error a b mine"), "<mine> a b");
    }

    #[test]
    fn set_and_unset() {
        assert_eq!(eval("set x 3"), Signal::ok("3"));
        assert_eq!(eval("set x 3\nset x\nget x"), Signal::ok(""));
        assert!(eval("get").is_error());
    }

    #[test]
    fn args_access() {
        assert_eq!(eval_args("args 2", &["a", "b"]), Signal::ok("b"));
        assert_eq!(eval_args("args 0", &["a"]), Signal::ok(""));
        assert_eq!(eval_args("args x", &["a"]), Signal::ok(""));
        assert_eq!(eval_args("args count", &["a", "b"]), Signal::ok("2"));
        assert_eq!(eval_args("args list", &["a", "b"]), Signal::ok("{'a''b'}"));
        assert_eq!(eval_args("args list 2", &["a", "b", "c"]), Signal::ok("{'b''c'}"));
        assert_eq!(eval_args("args list 1 3", &["a", "b", "c"]), Signal::ok("{'a''b'}"));
    }

    #[test]
    fn args_map_binds_names() {
        assert_eq!(eval_args("args map p q\nget q", &["1", "2"]), Signal::ok("2"));
        let sig = eval_args("args map p q", &["1"]);
        assert!(matches!(&sig, Signal::Error(m) if m.starts_with("<args> argument <q> at pos 2 is missing")));
    }

    #[test]
    fn defproc_defines_and_replaces() {
        assert_eq!(eval("defproc f {return 1}\ndefproc f {return 2}\nf"), Signal::ok("2"));
        assert!(eval("defproc f").is_error());
    }

    #[test]
    fn booleans() {
        assert_eq!(eval("true"), Signal::ok("true"));
        assert_eq!(eval("false"), Signal::ok(""));
    }

    #[test]
    fn help_lookup() {
        assert_eq!(eval("help"), Signal::ok(Primitive::Help.help()));
        assert_eq!(eval("help set"), Signal::ok(Primitive::Set.help()));
        assert_eq!(eval("defproc f {} {helps f}\nhelp f"), Signal::ok("helps f"));
        assert_eq!(
            eval("help nothing"),
            Signal::ok("helpstring for topic 'nothing' doesn't exist")
        );
    }

    #[test]
    fn help_topics() {
        let text = eval("help topics").into_payload();
        assert!(text.starts_with("primitives:\n  if\n"));
        assert!(text.contains("\n  db\n"));
        let list = value::unpack(eval("help list topics").payload());
        assert_eq!(list[0], "if");
        assert!(list.iter().any(|t| t == "help"));
        assert_eq!(eval("help topics list"), eval("help list topics"));
    }
}
