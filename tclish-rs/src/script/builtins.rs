//! Native command registry and the common command library.
//!
//! Every native command has the same shape: it receives the interpreter,
//! the calling task, and its already-resolved arguments, and returns a
//! [`Signal`].  The list commands below work on the canonical list format
//! from [`value`](super::value).

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::seq::SliceRandom;
use thiserror::Error;

use super::interp::Interpreter;
use super::signal::Signal;
use super::task::Task;
use super::value::{self, pack, unpack, Number};

/// A native command.
pub type NativeFn = Arc<dyn Fn(&mut Interpreter, &mut Task, &[String]) -> Signal + Send + Sync>;

/// Plain-function form used by the static command tables.
pub type Builtin = fn(&mut Interpreter, &mut Task, &[String]) -> Signal;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("'{0}' is already defined")]
    AlreadyDefined(String),
}

// ── Registry ──────────────────────────────────────────────────────────────────

struct Entry {
    func: NativeFn,
    help: String,
}

/// Name → native command, with help text.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Entry>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command.  Names are never silently replaced.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        func: NativeFn,
        help: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.commands.contains_key(&name) {
            return Err(RegistryError::AlreadyDefined(name));
        }
        self.commands.insert(
            name,
            Entry {
                func,
                help: help.into(),
            },
        );
        Ok(())
    }

    /// Register every entry of a static table.
    pub fn add_table(&mut self, table: &[(&str, Builtin, &str)]) -> Result<(), RegistryError> {
        for &(name, func, help) in table {
            self.add(name, Arc::new(func), help)?;
        }
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.commands.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<NativeFn> {
        self.commands.get(name).map(|e| e.func.clone())
    }

    pub fn help(&self, name: &str) -> Option<&str> {
        self.commands.get(name).map(|e| e.help.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

// ── Argument helpers ──────────────────────────────────────────────────────────

/// Argument `i`, or `""` when absent.
pub(crate) fn arg(args: &[String], i: usize) -> &str {
    args.get(i).map_or("", String::as_str)
}

/// Argument `i` read as an integer, or an error signal naming `cmd`.
pub(crate) fn integer_arg(task: &Task, args: &[String], i: usize, cmd: &str) -> Result<i64, Signal> {
    let text = arg(args, i);
    Number::parse(text)
        .and_then(Number::as_integer)
        .ok_or_else(|| task.error(format!("{text} is not a valid number"), cmd))
}

// ── Output ────────────────────────────────────────────────────────────────────

fn print(interp: &mut Interpreter, _task: &mut Task, args: &[String]) -> Signal {
    interp.output.push_str(&args.join(" "));
    interp.output.push('\n');
    Signal::empty()
}

fn puts(interp: &mut Interpreter, _task: &mut Task, args: &[String]) -> Signal {
    interp.output.push_str(&args.concat());
    Signal::empty()
}

// ── Lists ─────────────────────────────────────────────────────────────────────

fn list(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Signal {
    Signal::ok(pack(args))
}

fn take(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    if args.len() < 2 {
        return task.error("take requires a list and a number", "take");
    }
    let n = match integer_arg(task, args, 1, "take") {
        Ok(n) => n.max(0) as usize,
        Err(sig) => return sig,
    };
    let items = unpack(&args[0]);
    Signal::ok(pack((0..n).map(|i| items.get(i).map_or("", String::as_str))))
}

fn lindex(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    if args.len() < 2 {
        return task.error("lindex requires a list and a number", "lindex");
    }
    let n = match integer_arg(task, args, 1, "lindex") {
        Ok(n) => n,
        Err(sig) => return sig,
    };
    let items = unpack(&args[0]);
    let item = usize::try_from(n - 1).ok().and_then(|i| items.get(i));
    Signal::ok(item.cloned().unwrap_or_default())
}

fn lcount(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    match args.first() {
        Some(l) => Signal::ok(unpack(l).len().to_string()),
        None => task.error("lcount requires a list", "lcount"),
    }
}

fn ljoin(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    match args.first() {
        Some(l) => Signal::ok(unpack(l).join(arg(args, 1))),
        None => task.error("expected a list", "ljoin"),
    }
}

fn lappend(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    let Some((l, extra)) = args.split_first() else {
        return task.error("expected a list", "lappend");
    };
    let mut items = unpack(l);
    items.extend(extra.iter().cloned());
    Signal::ok(pack(items))
}

/// Interleave lists, padding short ones with `""` up to `len`.
fn zip(lists: &[Vec<String>], len: usize) -> String {
    let mut out = Vec::with_capacity(len * lists.len());
    for i in 0..len {
        for l in lists {
            out.push(l.get(i).map_or("", String::as_str));
        }
    }
    pack(out)
}

fn lzip(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Signal {
    let lists: Vec<Vec<String>> = args.iter().map(|a| unpack(a)).collect();
    let len = lists.iter().map(Vec::len).max().unwrap_or(0);
    Signal::ok(zip(&lists, len))
}

fn lzipmin(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Signal {
    let lists: Vec<Vec<String>> = args.iter().map(|a| unpack(a)).collect();
    let len = lists.iter().map(Vec::len).min().unwrap_or(0);
    Signal::ok(zip(&lists, len))
}

fn lmap(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    if args.len() < 2 {
        return task.error("expected a list and code", "lmap");
    }
    let mut results = Vec::new();
    let mut prev = String::new();
    for (i, item) in unpack(&args[0]).into_iter().enumerate() {
        let sig = interp.do_codebody(task, &args[1], vec![item, i.to_string(), prev]);
        if sig.is_abort() {
            return sig;
        }
        prev = sig.into_payload();
        results.push(prev.clone());
    }
    Signal::ok(pack(results))
}

fn lreduce(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    if args.len() < 2 {
        return task.error("expected a list and code", "lreduce");
    }
    let mut acc = arg(args, 2).to_owned();
    for (i, item) in unpack(&args[0]).into_iter().enumerate() {
        let sig = interp.do_codebody(task, &args[1], vec![item, i.to_string(), acc]);
        if sig.is_abort() {
            return sig;
        }
        acc = sig.into_payload();
    }
    Signal::ok(acc)
}

fn lfilter(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    if args.len() < 2 {
        return task.error("expected a list and code", "lfilter");
    }
    let mut kept = Vec::new();
    let mut prev = String::new();
    for (i, item) in unpack(&args[0]).into_iter().enumerate() {
        let sig = interp.do_codebody(task, &args[1], vec![item.clone(), i.to_string(), prev]);
        if sig.is_abort() {
            return sig;
        }
        prev = sig.into_payload();
        if value::is_true(&prev) {
            kept.push(item);
        }
    }
    Signal::ok(pack(kept))
}

fn range(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    let num = |i: usize, what: &str| {
        Number::parse(arg(args, i))
            .and_then(Number::as_integer)
            .ok_or_else(|| task.error(format!("{what} must be an integer"), "range"))
    };
    let bounds = match args.len() {
        0 => return task.error("please specify a range", "range"),
        1 => num(0, "stop").map(|stop| if stop < 0 { (-1, -1, stop) } else { (1, 1, stop) }),
        2 => num(0, "start").and_then(|start| {
            num(1, "stop").map(|stop| (start, if start > stop { -1 } else { 1 }, stop))
        }),
        _ => num(0, "start").and_then(|start| {
            num(1, "step").and_then(|step| num(2, "stop").map(|stop| (start, step, stop)))
        }),
    };
    let (start, step, stop) = match bounds {
        Ok(b) => b,
        Err(sig) => return sig,
    };
    if step == 0 {
        return task.error("step must not be zero", "range");
    }
    let mut out = Vec::new();
    let mut n = start;
    while (step > 0 && n <= stop) || (step < 0 && n >= stop) {
        out.push(n.to_string());
        match n.checked_add(step) {
            Some(next) => n = next,
            None => break,
        }
    }
    Signal::ok(pack(out))
}

fn choose(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Signal {
    let mut rng = rand::thread_rng();
    match args.choose(&mut rng) {
        Some(pick) => Signal::ok(pick.as_str()),
        None => Signal::empty(),
    }
}

// ── Control ───────────────────────────────────────────────────────────────────

fn for_each_item(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    if args.len() < 3 {
        return task.error("expected a name, a list and code", "for");
    }
    let mut result = String::new();
    for (i, item) in unpack(&args[1]).into_iter().enumerate() {
        task.set(args[0].as_str(), item);
        task.set("i", i.to_string());
        task.set("ans", result.as_str());
        let sig = interp.simple_evaluate(task, &args[2]);
        if sig.is_abort() {
            return sig;
        }
        result = sig.into_payload();
    }
    Signal::ok(result)
}

fn foreach(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    let (names, list, body) = if arg(args, 1).eq_ignore_ascii_case("in") {
        (arg(args, 0), arg(args, 2), arg(args, 3))
    } else {
        (arg(args, 0), arg(args, 1), arg(args, 2))
    };
    let names = unpack(names);
    if names.is_empty() {
        return task.error("foreach needs at least one variable name", "foreach");
    }
    let mut items = unpack(list).into_iter();
    let mut result = String::new();
    while items.len() > 0 {
        for name in &names {
            task.set(name.as_str(), items.next().unwrap_or_default());
        }
        let sig = interp.simple_evaluate(task, body);
        if sig.is_abort() {
            return sig;
        }
        result = sig.into_payload();
    }
    Signal::ok(result)
}

fn proc(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    if args.len() < 3 {
        return task.error(
            "a procedure needs a name, an argument list and a body, and optionally a helpstring",
            "proc",
        );
    }
    let params = unpack(&args[1]);
    let body = if params.is_empty() {
        args[2].clone()
    } else {
        let quoted: Vec<String> = params.iter().map(|p| format!("'{}'", value::escape(p))).collect();
        format!("args map {}\n{}", quoted.join(" "), args[2])
    };
    interp.add_definition(args[0].as_str(), body, arg(args, 3));
    Signal::empty()
}

fn eval(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    match args.split_first() {
        Some((code, rest)) => interp.evaluate(task, code, rest.to_vec(), None),
        None => Signal::empty(),
    }
}

/// `try <code> [catch <handler>] [args <list>]`; a bare second word is
/// taken as the handler.
fn try_(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    let Some((code, rest)) = args.split_first() else {
        return Signal::empty();
    };
    let mut handler: Option<&str> = None;
    let mut call_args = Vec::new();
    let mut words = rest.iter();
    while let Some(word) = words.next() {
        match word.to_ascii_lowercase().as_str() {
            "catch" | "except" => handler = words.next().map(String::as_str),
            "args" => call_args = words.next().map(|l| unpack(l)).unwrap_or_default(),
            _ if handler.is_none() => handler = Some(word.as_str()),
            _ => {}
        }
    }
    let sig = interp.evaluate(task, code, call_args.clone(), None);
    let Signal::Error(message) = sig else {
        return sig;
    };
    match handler {
        Some(handler) => {
            let mut handler_args = vec![message, code.clone()];
            handler_args.extend(call_args);
            interp.evaluate(task, handler, handler_args, None)
        }
        None => Signal::Normal(message),
    }
}

fn source(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    let Some(path) = args.first() else {
        return task.error("source requires a file name", "source");
    };
    match interp.load_file(path) {
        Ok(text) => interp.eval_in_place(task, &text),
        Err(e) => task.error(e.to_string(), "source"),
    }
}

fn exit(interp: &mut Interpreter, _task: &mut Task, args: &[String]) -> Signal {
    interp.request_quit();
    Signal::ok(arg(args, 0))
}

// ── Table ─────────────────────────────────────────────────────────────────────

const COMMANDS: &[(&str, Builtin, &str)] = &[
    ("print", print, "usage:\n  print <value>...\nwrite the values separated by spaces, then a newline."),
    ("puts", puts, "usage:\n  puts <value>...\nwrite the values with no separator and no newline."),
    ("list", list, "usage:\n  list <element>...\nreturn a list holding the elements."),
    ("take", take, "usage:\n  take <list> <count>\nreturn the first <count> items, padded with empty strings."),
    ("lindex", lindex, "usage:\n  lindex <list> <index>\nreturn the item at the 1-based <index>, or an empty string."),
    ("lcount", lcount, "usage:\n  lcount <list>\nreturn the number of items in <list>."),
    ("ljoin", ljoin, "usage:\n  ljoin <list> [<sep>]\nconcatenate the items, separated by <sep>."),
    ("lappend", lappend, "usage:\n  lappend <list> <item>...\nreturn <list> with the items added at the end."),
    ("lzip", lzip, "usage:\n  lzip <list>...\ninterleave the lists, padding short ones with empty strings."),
    ("lzipmax", lzip, "usage:\n  lzipmax <list>...\nsame as lzip."),
    ("lzipmin", lzipmin, "usage:\n  lzipmin <list>...\ninterleave the lists up to the length of the shortest."),
    ("lmap", lmap, "usage:\n  lmap <list> <code>\nrun <code> with (item, index, previous result) for each item and return the results as a list."),
    ("lreduce", lreduce, "usage:\n  lreduce <list> <code> [<initial>]\nfold the list: <code> gets (item, index, accumulator) and returns the new accumulator."),
    ("lfilter", lfilter, "usage:\n  lfilter <list> <code>\nkeep the items for which <code> returns a true value."),
    ("range", range, "usage:\n  range <n>\n  range <start> <stop>\n  range <start> <step> <stop>\nreturn the integers of an inclusive range as a list."),
    ("choose", choose, "usage:\n  choose <options>...\nreturn one of the options at random."),
    ("for", for_each_item, "usage:\n  for <name> <list> <code>\nrun <code> once per item with $<name>, $i and $ans bound."),
    ("foreach", foreach, "usage:\n  foreach <names> [in] <list> <code>\nrun <code> binding successive items to each name in <names>."),
    ("proc", proc, "usage:\n  proc <name> <params> <body> [<help>]\ndefine a procedure whose parameters are bound with args map."),
    ("eval", eval, "usage:\n  eval <code> [<arg>...]\nevaluate <code> in a new scope holding the arguments."),
    ("try", try_, "usage:\n  try <code> [catch <handler>] [args <list>]\nevaluate <code>; on error run <handler> with (message, code, args...) or return the message."),
    ("source", source, "usage:\n  source <file>\nevaluate a script file in the current scope."),
    ("exit", exit, "usage:\n  exit [<value>]\nstop evaluating and return <value>."),
];

/// Register the common command library.
pub fn register(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.add_table(COMMANDS)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
