//! The evaluator and its dispatch chain.
//!
//! [`Interpreter::evaluate`] pushes a frame, runs
//! [`Interpreter::simple_evaluate`] over the program's sentences, pops the
//! frame, and absorbs a `ForcedReturn`.  Each sentence resolves its words,
//! applies `{*}` splatting and the `name=` modifier, then dispatches through
//! [`DISPATCH_ORDER`]: primitives, native commands, live objects, handles,
//! and finally user definitions.

use std::collections::{BTreeMap, HashMap};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::object::{self, ObjectRegistry};
use crate::scheduler::{self, EventQueue};
use crate::store::{self, MemoryStore, Store};

use super::builtins::{self, CommandRegistry, NativeFn, RegistryError};
use super::expand::{self, EvalContext};
use super::primitives::Primitive;
use super::signal::Signal;
use super::stmt::{self, Sentence, Token};
use super::task::{Task, DEFAULT_STACK_LIMIT};
use super::{math, strings, value};

/// The literal splat marker.
pub const SPLAT: &str = "{*}";

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpConfig {
    /// Frames a task may hold.
    pub stack_limit: usize,
    /// Register the list, math and string command library.
    pub load_stdlib: bool,
}

impl Default for InterpConfig {
    fn default() -> Self {
        InterpConfig {
            stack_limit: DEFAULT_STACK_LIMIT,
            load_stdlib: true,
        }
    }
}

// ── File loader ───────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no file loader is installed")]
    NoLoader,
}

/// Resolves a path to script text for `source`.
pub type FileLoader = Arc<dyn Fn(&str) -> Result<String, LoadError> + Send + Sync>;

/// A loader that reads from the local file system.
pub fn fs_loader() -> FileLoader {
    Arc::new(|path: &str| {
        std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_owned(),
            source,
        })
    })
}

// ── Namespaces ────────────────────────────────────────────────────────────────

/// The places a command name can be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Primitive,
    Native,
    Object,
    Handle,
    Definition,
}

/// Lookup priority; the first namespace that knows a name wins.
pub const DISPATCH_ORDER: [Namespace; 5] = [
    Namespace::Primitive,
    Namespace::Native,
    Namespace::Object,
    Namespace::Handle,
    Namespace::Definition,
];

/// A resolved command, ready to invoke.
#[derive(Clone)]
pub enum Callable {
    Primitive(Primitive),
    Native(NativeFn),
    Object(String),
    Handle(NativeFn),
    Definition(String),
}

impl Callable {
    pub fn namespace(&self) -> Namespace {
        match self {
            Callable::Primitive(_) => Namespace::Primitive,
            Callable::Native(_) => Namespace::Native,
            Callable::Object(_) => Namespace::Object,
            Callable::Handle(_) => Namespace::Handle,
            Callable::Definition(_) => Namespace::Definition,
        }
    }
}

/// A user procedure added by `defproc` or `proc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub body: String,
    pub help: String,
}

/// A temporarily bound callable such as `self`.
#[derive(Clone)]
pub struct Handle {
    pub func: NativeFn,
    pub help: String,
}

/// `name=` with a single trailing `=` (so `==` and `=` are not modifiers).
pub fn is_modifier(name: &str) -> bool {
    let b = name.as_bytes();
    b.len() >= 2 && b[b.len() - 1] == b'=' && b[b.len() - 2] != b'='
}

// ── Interpreter ───────────────────────────────────────────────────────────────

pub struct Interpreter {
    config: InterpConfig,
    /// Native commands.
    pub commands: CommandRegistry,
    handles: HashMap<String, Handle>,
    definitions: BTreeMap<String, Definition>,
    /// General help topics that are not commands.
    pub helps: BTreeMap<String, String>,
    store: Box<dyn Store>,
    pub objects: ObjectRegistry,
    pub events: EventQueue,
    /// Text written by `print` and `puts`, drained by the host.
    pub output: String,
    /// Used by `source`.
    pub file_loader: Option<FileLoader>,
    quit_requested: bool,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter::with_config(InterpConfig::default())
    }

    pub fn with_config(config: InterpConfig) -> Self {
        Interpreter::with_store(config, Box::new(MemoryStore::new()))
    }

    pub fn with_store(config: InterpConfig, store: Box<dyn Store>) -> Self {
        let load_stdlib = config.load_stdlib;
        let mut interp = Interpreter {
            config,
            commands: CommandRegistry::new(),
            handles: HashMap::new(),
            definitions: BTreeMap::new(),
            helps: BTreeMap::new(),
            store,
            objects: ObjectRegistry::new(),
            events: EventQueue::new(),
            output: String::new(),
            file_loader: None,
            quit_requested: false,
        };
        if let Err(e) = interp.install_core() {
            warn!(error = %e, "core command registration failed");
        }
        if load_stdlib {
            if let Err(e) = interp.load_stdlib() {
                warn!(error = %e, "library registration failed");
            }
        }
        interp
    }

    fn install_core(&mut self) -> Result<(), RegistryError> {
        store::register(&mut self.commands)?;
        object::register(&mut self.commands)?;
        scheduler::register(&mut self.commands)
    }

    /// Register the list, math and string libraries.
    pub fn load_stdlib(&mut self) -> Result<(), RegistryError> {
        builtins::register(&mut self.commands)?;
        math::register(&mut self.commands)?;
        strings::register(&mut self.commands)
    }

    pub fn config(&self) -> &InterpConfig {
        &self.config
    }

    /// A fresh task using the configured stack limit.
    pub fn new_task(&self) -> Task {
        Task::new(self.config.stack_limit)
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn store_mut(&mut self) -> &mut dyn Store {
        self.store.as_mut()
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Stop every evaluation in progress after its current sentence.
    pub fn request_quit(&mut self) {
        self.quit_requested = true;
    }

    pub fn load_file(&self, path: &str) -> Result<String, LoadError> {
        match &self.file_loader {
            Some(loader) => loader(path),
            None => Err(LoadError::NoLoader),
        }
    }

    // ── Registration ──────────────────────────────────────────────────────────

    pub fn add_command(
        &mut self,
        name: impl Into<String>,
        func: NativeFn,
        help: impl Into<String>,
    ) -> Result<(), RegistryError> {
        self.commands.add(name, func, help)
    }

    /// Add or replace a user definition.
    pub fn add_definition(
        &mut self,
        name: impl Into<String>,
        body: impl Into<String>,
        help: impl Into<String>,
    ) {
        self.definitions.insert(
            name.into(),
            Definition {
                body: body.into(),
                help: help.into(),
            },
        );
    }

    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    pub fn definitions(&self) -> impl Iterator<Item = (&String, &Definition)> {
        self.definitions.iter()
    }

    pub fn handle(&self, name: &str) -> Option<&Handle> {
        self.handles.get(name)
    }

    pub fn handle_names(&self) -> impl Iterator<Item = &String> {
        self.handles.keys()
    }

    /// Install a handle, returning whatever it replaced.
    pub fn add_handle(&mut self, name: impl Into<String>, handle: Handle) -> Option<Handle> {
        self.handles.insert(name.into(), handle)
    }

    /// Remove a handle and put back the binding it shadowed, if any.
    pub fn restore_handle(&mut self, name: &str, prev: Option<Handle>) {
        match prev {
            Some(prev) => {
                self.handles.insert(name.to_owned(), prev);
            }
            None => {
                self.handles.remove(name);
            }
        }
    }

    /// Bind `name` for the lifetime of the returned guard.  The previous
    /// binding comes back when the guard drops, however the scope exits.
    pub fn bind_handle(&mut self, name: impl Into<String>, handle: Handle) -> HandleGuard<'_> {
        let name = name.into();
        let prev = self.add_handle(name.clone(), handle);
        HandleGuard {
            interp: self,
            name,
            prev,
        }
    }

    // ── Variables ─────────────────────────────────────────────────────────────

    /// Frames first, then the store.  An empty store value counts as unset.
    pub fn get_value(&self, task: &Task, name: &str) -> Option<String> {
        if let Some(v) = task.get(name) {
            return Some(v.to_owned());
        }
        Some(self.store.get(&[name.to_owned()])).filter(|v| !v.is_empty())
    }

    // ── Evaluation ────────────────────────────────────────────────────────────

    /// Run `text` in a new frame holding `args`.  `label` defaults to the
    /// text itself.
    pub fn evaluate(
        &mut self,
        task: &mut Task,
        text: &str,
        args: Vec<String>,
        label: Option<&str>,
    ) -> Signal {
        if !task.push(args, label.unwrap_or(text)) {
            debug!(depth = task.depth(), limit = task.limit(), "frame stack limit exceeded");
            return task.error("stack limit exceeded", "eval");
        }
        let sig = self.simple_evaluate(task, text);
        task.pop();
        sig.absorb_return()
    }

    /// Run `text` in the current frame.  `ForcedReturn` is not absorbed.
    pub fn simple_evaluate(&mut self, task: &mut Task, text: &str) -> Signal {
        if !task.enter() {
            debug!(nesting = task.nesting(), "evaluation nesting limit exceeded");
            return task.error("stack limit exceeded", "eval");
        }
        let sig = self.run_sentences(task, text);
        task.leave();
        sig
    }

    fn run_sentences(&mut self, task: &mut Task, text: &str) -> Signal {
        let sentences = match stmt::split(text) {
            Ok(sentences) => sentences,
            Err(e) => return task.error(e.to_string(), "read_sentence"),
        };
        let mut result = String::new();
        for sentence in &sentences {
            match self.eval_sentence(task, sentence) {
                Signal::Normal(v) => result = v,
                Signal::Comment(_) => {}
                abort => return abort,
            }
            if self.quit_requested {
                return Signal::ForcedReturn(result);
            }
        }
        Signal::Normal(result)
    }

    /// Run `text` in the current frame and absorb a `ForcedReturn`.  Used for
    /// top-level input and `source`, where variables should persist.
    pub fn eval_in_place(&mut self, task: &mut Task, text: &str) -> Signal {
        let sig = self.simple_evaluate(task, text).absorb_return();
        if let Signal::Error(msg) = &sig {
            debug!(error = %msg, "top-level evaluation failed");
        }
        sig
    }

    /// Evaluate a code body.  A bare command name is called with the
    /// arguments splatted, so `lmap $l upper` works like a lambda.
    pub fn do_codebody(&mut self, task: &mut Task, body: &str, args: Vec<String>) -> Signal {
        if value::is_command_name(body) {
            let call = format!("{body} {SPLAT} [args list]");
            self.evaluate(task, &call, args, Some(body))
        } else {
            self.evaluate(task, body, args, None)
        }
    }

    /// Evaluate one sentence.
    pub fn eval_sentence(&mut self, task: &mut Task, sentence: &Sentence<'_>) -> Signal {
        let Some((&head, rest)) = sentence.tokens.split_first() else {
            return Signal::Comment(String::new());
        };
        if sentence.is_comment() {
            return Signal::Comment(String::new());
        }

        let name = match expand::resolve(head, task, self) {
            sig if sig.is_abort() => return sig,
            sig => sig.into_payload(),
        };
        let mut args = match self.resolve_args(task, &name, rest) {
            Ok(args) => args,
            Err(sig) => return sig,
        };

        let (command, field) = if is_modifier(&name) {
            let Some(first) = args.first_mut() else {
                return task.error("modifiers require a field name", &name);
            };
            let field = std::mem::take(first);
            *first = self.get_value(task, &field).unwrap_or_default();
            (&name[..name.len() - 1], Some(field))
        } else {
            (name.as_str(), None)
        };

        trace!(command, argc = args.len(), depth = task.depth(), "dispatch");
        let sig = self.call(task, command, args);
        if sig.is_abort() {
            return sig;
        }
        if let Some(field) = field {
            task.update(&field, sig.payload());
        }
        sig
    }

    /// Resolve argument tokens, expanding `{*} <list>` into separate
    /// arguments.  `help {*}` keeps the marker as a literal topic.
    fn resolve_args(
        &mut self,
        task: &mut Task,
        command: &str,
        tokens: &[Token<'_>],
    ) -> Result<Vec<String>, Signal> {
        let mut args = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            let token = tokens[i];
            if token.text == SPLAT {
                if command == "help" && i == 0 {
                    args.push(SPLAT.to_owned());
                    i += 1;
                    continue;
                }
                if let Some(&next) = tokens.get(i + 1) {
                    let sig = expand::resolve(next, task, self);
                    if sig.is_abort() {
                        return Err(sig);
                    }
                    args.extend(value::unpack(sig.payload()));
                    i += 2;
                    continue;
                }
            }
            let sig = expand::resolve(token, task, self);
            if sig.is_abort() {
                return Err(sig);
            }
            args.push(sig.into_payload());
            i += 1;
        }
        Ok(args)
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Find `name` in the first namespace that knows it.
    pub fn lookup(&self, name: &str) -> Option<Callable> {
        DISPATCH_ORDER
            .iter()
            .find_map(|&ns| self.lookup_in(ns, name))
    }

    pub fn lookup_in(&self, ns: Namespace, name: &str) -> Option<Callable> {
        match ns {
            Namespace::Primitive => Primitive::from_name(name).map(Callable::Primitive),
            Namespace::Native => self.commands.get(name).map(Callable::Native),
            Namespace::Object => self.objects.resolve_id(name).map(Callable::Object),
            Namespace::Handle => self
                .handles
                .get(name)
                .map(|h| Callable::Handle(h.func.clone())),
            Namespace::Definition => self
                .definitions
                .get(name)
                .map(|d| Callable::Definition(d.body.clone())),
        }
    }

    /// Look up and invoke `name`, or fail with "unknown command".
    pub fn call(&mut self, task: &mut Task, name: &str, args: Vec<String>) -> Signal {
        match self.lookup(name) {
            Some(callable) => self.invoke(task, name, callable, args),
            None => task.error("unknown command", name),
        }
    }

    pub fn invoke(
        &mut self,
        task: &mut Task,
        name: &str,
        callable: Callable,
        args: Vec<String>,
    ) -> Signal {
        match callable {
            Callable::Primitive(p) => p.call(self, task, &args),
            Callable::Native(f) | Callable::Handle(f) => f(self, task, &args),
            Callable::Object(id) => object::instance_command(self, task, &id, &args),
            Callable::Definition(body) => self.evaluate(task, &body, args, Some(name)),
        }
    }
}

impl EvalContext for Interpreter {
    fn lookup_var(&self, task: &Task, name: &str) -> Option<String> {
        self.get_value(task, name)
    }

    fn substitute(&mut self, task: &mut Task, body: &str) -> Signal {
        self.simple_evaluate(task, body)
    }
}

// ── Handle guard ──────────────────────────────────────────────────────────────

/// Scoped handle binding returned by [`Interpreter::bind_handle`].
pub struct HandleGuard<'a> {
    interp: &'a mut Interpreter,
    name: String,
    prev: Option<Handle>,
}

impl Deref for HandleGuard<'_> {
    type Target = Interpreter;

    fn deref(&self) -> &Interpreter {
        self.interp
    }
}

impl DerefMut for HandleGuard<'_> {
    fn deref_mut(&mut self) -> &mut Interpreter {
        self.interp
    }
}

impl Drop for HandleGuard<'_> {
    fn drop(&mut self) {
        let prev = self.prev.take();
        self.interp.restore_handle(&self.name, prev);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn native(f: fn(&mut Interpreter, &mut Task, &[String]) -> Signal) -> NativeFn {
        Arc::new(f)
    }

    fn interp() -> Interpreter {
        let mut interp = Interpreter::with_config(InterpConfig {
            load_stdlib: false,
            ..InterpConfig::default()
        });
        interp
            .add_command(
                "incr",
                native(|_, task, args| match args.first().and_then(|a| a.parse::<i64>().ok()) {
                    Some(n) => Signal::ok((n + 1).to_string()),
                    None => task.error("not a number", "incr"),
                }),
                "",
            )
            .unwrap();
        interp
            .add_command(
                "cat",
                native(|_, _, args| Signal::ok(args.join("|"))),
                "",
            )
            .unwrap();
        interp
            .add_command(
                "argc",
                native(|_, _, args| Signal::ok(args.len().to_string())),
                "",
            )
            .unwrap();
        interp
    }

    fn run(interp: &mut Interpreter, src: &str) -> Signal {
        let mut task = Task::default();
        interp.evaluate(&mut task, src, Vec::new(), None)
    }

    fn eval(src: &str) -> Signal {
        run(&mut interp(), src)
    }

    #[test]
    fn last_normal_result_wins() {
        assert_eq!(eval("cat a\ncat b"), Signal::ok("b"));
    }

    #[test]
    fn comment_keeps_previous_result() {
        assert_eq!(eval("cat 1\n# note\ncat 3"), Signal::ok("3"));
        assert_eq!(eval("cat 1\n# trailing note"), Signal::ok("1"));
    }

    #[test]
    fn error_stops_remaining_sentences() {
        let mut interp = interp();
        let sig = run(&mut interp, "set x 1\nerror boom\nset x 2");
        assert!(matches!(&sig, Signal::Error(m) if m.starts_with("<error> boom")));
    }

    #[test]
    fn unknown_command() {
        let sig = eval("no-such-thing a b");
        assert!(matches!(&sig, Signal::Error(m) if m.starts_with("<no-such-thing> unknown command")));
    }

    #[test]
    fn brace_literal_is_not_interpolated() {
        assert_eq!(eval("set b 1\ncat {a $b [c]}"), Signal::ok("a $b [c]"));
    }

    #[test]
    fn bracket_substitution_shares_frame() {
        assert_eq!(eval("cat [set x 4] $x"), Signal::ok("4|4"));
    }

    #[test]
    fn modifier_updates_binding_where_found() {
        let mut interp = interp();
        let mut task = Task::default();
        task.push(Vec::new(), "outer");
        task.set("x", "5");
        let sig = interp.evaluate(&mut task, "incr= x", Vec::new(), None);
        assert_eq!(sig, Signal::ok("6"));
        assert_eq!(task.depth(), 1);
        assert_eq!(task.get("x"), Some("6"));
    }

    #[test]
    fn modifier_on_unset_variable_starts_empty() {
        assert_eq!(eval("cat= y\nget y"), Signal::ok(""));
        assert!(eval("incr= y").is_error());
    }

    #[test]
    fn modifier_needs_field() {
        let sig = eval("incr=");
        assert!(matches!(&sig, Signal::Error(m) if m.contains("field name")));
    }

    #[test]
    fn double_equals_is_not_a_modifier() {
        assert!(!is_modifier("=="));
        assert!(!is_modifier("="));
        assert!(is_modifier("+="));
        assert!(is_modifier("incr="));
    }

    #[test]
    fn modifier_reading_is_lexical() {
        let mut interp = interp();
        interp.add_definition("upper=", "return shadowed", "");
        interp.add_definition("upper", "cat [args 1] !", "");
        assert_eq!(run(&mut interp, "set x abc\nupper= x\nget x"), Signal::ok("abc|!"));
        interp
            .add_command("le=", native(|_, _, args| Signal::ok(args.join(","))), "")
            .unwrap();
        assert!(run(&mut interp, "set x 1\nle= x").is_error());
    }

    #[test]
    fn deep_nesting_is_a_recoverable_error() {
        let mut interp = interp();
        let mut task = Task::default();
        let brackets = |n: usize| format!("{}true{}", "[".repeat(n), "]".repeat(n));
        assert_eq!(interp.evaluate(&mut task, &brackets(100), Vec::new(), None), Signal::ok("true"));

        let sig = interp.evaluate(&mut task, &brackets(600), Vec::new(), None);
        assert!(matches!(&sig, Signal::Error(m) if m.contains("stack limit exceeded")), "{sig:?}");
        assert!(interp.evaluate(&mut task, &brackets(2000), Vec::new(), None).is_error());

        assert_eq!(task.depth(), 0);
        assert_eq!(task.nesting(), 0);
        assert_eq!(interp.evaluate(&mut task, "cat fine", Vec::new(), None), Signal::ok("fine"));
    }

    #[test]
    fn splat_expands_list() {
        assert_eq!(eval("argc {*} {'a''b''c'}"), Signal::ok("3"));
        assert_eq!(eval("cat x {*} {'a''b'} y"), Signal::ok("x|a|b|y"));
    }

    #[test]
    fn splat_without_following_token_is_literal() {
        assert_eq!(eval("cat {*}"), Signal::ok("*"));
    }

    #[test]
    fn help_keeps_splat_literal() {
        let sig = eval("help {*}");
        assert_eq!(sig, Signal::ok("helpstring for topic '{*}' doesn't exist"));
    }

    #[test]
    fn return_is_absorbed_at_evaluate_boundary() {
        let mut interp = interp();
        interp.add_definition("f", "cat before\nreturn x\ncat after", "");
        assert_eq!(run(&mut interp, "f"), Signal::ok("x"));
        assert_eq!(run(&mut interp, "cat [f] done"), Signal::ok("x|done"));
    }

    #[test]
    fn return_inside_substitution_leaves_the_enclosing_evaluation() {
        assert_eq!(eval("cat a [return r] b\ncat never"), Signal::ok("r"));
    }

    #[test]
    fn stack_limit_is_recoverable() {
        let mut interp = interp();
        interp.add_definition("down", "down", "");
        let mut task = Task::default();
        let sig = interp.evaluate(&mut task, "down", Vec::new(), None);
        assert!(matches!(&sig, Signal::Error(m) if m.contains("stack limit exceeded")));
        assert_eq!(task.depth(), 0);
        assert_eq!(interp.evaluate(&mut task, "cat ok", Vec::new(), None), Signal::ok("ok"));
    }

    #[test]
    fn dispatch_order_prefers_primitives_then_natives() {
        let mut interp = interp();
        interp.add_definition("cat", "return shadowed", "");
        interp.add_definition("set", "return shadowed", "");
        assert_eq!(run(&mut interp, "cat a b"), Signal::ok("a|b"));
        assert_eq!(run(&mut interp, "set v 1"), Signal::ok("1"));
        assert_eq!(
            interp.lookup("cat").map(|c| c.namespace()),
            Some(Namespace::Native)
        );
    }

    #[test]
    fn handles_shadow_definitions_and_restore() {
        let mut interp = interp();
        interp.add_definition("who", "return definition", "");
        {
            let mut scope = interp.bind_handle(
                "who",
                Handle {
                    func: native(|_, _, _| Signal::ok("handle")),
                    help: String::new(),
                },
            );
            assert_eq!(run(&mut scope, "who"), Signal::ok("handle"));
        }
        assert!(interp.handle("who").is_none());
        assert_eq!(run(&mut interp, "who"), Signal::ok("definition"));
    }

    #[test]
    fn nested_handle_binding_restores_outer() {
        let mut interp = interp();
        let outer = Handle {
            func: native(|_, _, _| Signal::ok("outer")),
            help: String::new(),
        };
        let inner = Handle {
            func: native(|_, _, _| Signal::ok("inner")),
            help: String::new(),
        };
        let mut scope = interp.bind_handle("h", outer);
        {
            let mut nested = scope.bind_handle("h", inner);
            assert_eq!(run(&mut nested, "h"), Signal::ok("inner"));
        }
        assert_eq!(run(&mut scope, "h"), Signal::ok("outer"));
    }

    #[test]
    fn variable_falls_back_to_store() {
        let mut interp = interp();
        assert_eq!(run(&mut interp, "get x"), Signal::ok(""));
        interp.store_mut().set(&["x".to_owned()], "stored");
        assert_eq!(run(&mut interp, "get x"), Signal::ok("stored"));
        assert_eq!(run(&mut interp, "set x local\nget x"), Signal::ok("local"));
    }

    /// A store whose only readable operation is `get`.
    #[derive(Default)]
    struct GetOnly(MemoryStore);

    impl Store for GetOnly {
        fn get(&self, path: &[String]) -> String {
            self.0.get(path)
        }
        fn set(&mut self, path: &[String], value: &str) {
            self.0.set(path, value)
        }
        fn has(&self, _: &[String]) -> bool {
            panic!("variable lookup must only call get")
        }
        fn list(&self, _: &[String]) -> Vec<String> {
            panic!("variable lookup must only call get")
        }
        fn unset(&mut self, path: &[String]) {
            self.0.unset(path)
        }
        fn prune(&mut self, path: &[String]) -> bool {
            self.0.prune(path)
        }
    }

    #[test]
    fn variable_fallback_only_reads_with_get() {
        let config = InterpConfig {
            load_stdlib: false,
            ..InterpConfig::default()
        };
        let mut store = GetOnly::default();
        store.set(&["colour".to_owned()], "blue");
        let mut interp = Interpreter::with_store(config, Box::new(store));
        assert_eq!(run(&mut interp, "get colour"), Signal::ok("blue"));
        assert_eq!(run(&mut interp, "return \"$colour $shade\""), Signal::ok("blue "));
        assert_eq!(run(&mut interp, "get shade"), Signal::ok(""));
    }

    #[test]
    fn do_codebody_calls_bare_names_with_args() {
        let mut interp = interp();
        let mut task = Task::default();
        let sig = interp.do_codebody(&mut task, "cat", vec!["a".into(), "b c".into()]);
        assert_eq!(sig, Signal::ok("a|b c"));
        let sig = interp.do_codebody(&mut task, "cat [args 2]", vec!["a".into(), "b".into()]);
        assert_eq!(sig, Signal::ok("b"));
    }

    #[test]
    fn scan_error_becomes_error_signal() {
        let sig = eval("cat a }");
        assert!(matches!(&sig, Signal::Error(m) if m.contains("trailing close brace")));
    }

    #[test]
    fn quit_stops_all_levels() {
        let mut interp = interp();
        interp
            .add_command("stop", native(|i, _, _| {
                i.request_quit();
                Signal::ok("bye")
            }), "")
            .unwrap();
        interp.add_definition("f", "stop\ncat unreachable", "");
        assert_eq!(run(&mut interp, "f\ncat unreachable"), Signal::ok("bye"));
    }

    #[test]
    fn eval_in_place_keeps_variables() {
        let mut interp = interp();
        let mut task = Task::with_base(64, Vec::new(), "repl");
        interp.eval_in_place(&mut task, "set x 1");
        assert_eq!(interp.eval_in_place(&mut task, "get x"), Signal::ok("1"));
        assert_eq!(interp.eval_in_place(&mut task, "return y"), Signal::ok("y"));
    }
}
