//! Classes and live object instances.
//!
//! A class declares validated variables, methods and an optional
//! constructor.  `new` creates an instance with an id of the form
//! `<instance-CLASS-N>`, optionally bound to a name; either the id or the
//! name then works as a command:
//!
//! ```text
//! class counter var count integer? 0 method bump {self set count [+ 1 [self get count]]}
//! new counter c
//! c bump
//! c get count
//! ```
//!
//! Methods and constructors run in a new frame with a `self` handle bound
//! to the instance.  Variable writes through `set` run the variable's
//! validator as `<validator> {*} [args list]`; an empty result rejects the
//! value.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::script::builtins::{arg, Builtin, CommandRegistry, RegistryError};
use crate::script::interp::{Handle, SPLAT};
use crate::script::stmt;
use crate::script::value::{self, pack};
use crate::script::{Interpreter, Signal, Task};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarSpec {
    pub validator: String,
    pub initial: String,
}

#[derive(Debug, Clone, Default)]
pub struct Class {
    pub name: String,
    pub vars: BTreeMap<String, VarSpec>,
    pub methods: BTreeMap<String, String>,
    pub constructor: String,
    pub help: String,
}

#[derive(Debug, Clone)]
pub struct Instance {
    pub id: String,
    pub name: Option<String>,
    pub class: String,
    pub vars: BTreeMap<String, String>,
}

// ── Registry ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ObjectRegistry {
    next_id: u64,
    objects: HashMap<String, Instance>,
    names: HashMap<String, String>,
    classes: BTreeMap<String, Class>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve an instance id or bound name to a live id.
    pub fn resolve_id(&self, name: &str) -> Option<String> {
        if self.objects.contains_key(name) {
            return Some(name.to_owned());
        }
        self.names
            .get(name)
            .filter(|id| self.objects.contains_key(*id))
            .cloned()
    }

    pub fn is_object(&self, name: &str) -> bool {
        self.resolve_id(name).is_some()
    }

    pub fn instance(&self, name: &str) -> Option<&Instance> {
        let id = self.resolve_id(name)?;
        self.objects.get(&id)
    }

    pub fn class(&self, name: &str) -> Option<&Class> {
        self.classes.get(name)
    }

    /// Define or replace a class.
    pub fn add_class(&mut self, class: Class) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn class_names(&self) -> Vec<String> {
        self.classes.keys().cloned().collect()
    }

    pub fn instance_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.objects.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn next_id(&mut self, class: &str) -> String {
        self.next_id += 1;
        format!("<instance-{class}-{}>", self.next_id)
    }

    fn insert(&mut self, instance: Instance) {
        if let Some(name) = &instance.name {
            self.names.insert(name.clone(), instance.id.clone());
        }
        self.objects.insert(instance.id.clone(), instance);
    }

    fn remove(&mut self, id: &str) -> Option<Instance> {
        let instance = self.objects.remove(id)?;
        if let Some(name) = &instance.name {
            if self.names.get(name).is_some_and(|bound| bound == id) {
                self.names.remove(name);
            }
        }
        Some(instance)
    }

    /// Help for a class name or a live object.
    pub fn help(&self, topic: &str) -> Option<String> {
        if let Some(class) = self.classes.get(topic) {
            if class.help.is_empty() {
                return self.show_class(topic);
            }
            return Some(class.help.clone());
        }
        self.show_object(topic)
    }

    pub fn show_object(&self, name: &str) -> Option<String> {
        let instance = self.instance(name)?;
        let mut text = format!("id {}\nclass {}", instance.id, instance.class);
        if let Some(name) = &instance.name {
            text.push_str(&format!("\nname {name}"));
        }
        text.push_str("\nvars");
        for (key, value) in &instance.vars {
            text.push_str(&format!("\n  {key} {value}"));
        }
        Some(text)
    }

    pub fn show_class(&self, name: &str) -> Option<String> {
        let class = self.classes.get(name)?;
        let mut text = format!("class {name}");
        if !class.constructor.is_empty() {
            match stmt::header(&class.constructor) {
                Some(params) => text.push_str(&format!(" {{ {} }}", params.join(" "))),
                None => text.push_str(" <args...>"),
            }
        }
        text.push_str("\nvars");
        for (key, spec) in &class.vars {
            text.push_str(&format!("\n  {key} {} {}", spec.validator, spec.initial));
        }
        text.push_str("\nmethods");
        for (key, body) in &class.methods {
            text.push_str(&format!("\n  {key}"));
            if let Some(params) = stmt::header(body) {
                text.push_str(&format!(" {{ {} }}", params.join(" ")));
            }
        }
        Some(text)
    }
}

// ── Instance dispatch ─────────────────────────────────────────────────────────

/// The `self` handle bound while a method or constructor runs.
fn self_handle(interp: &Interpreter, id: &str) -> Handle {
    let target = id.to_owned();
    Handle {
        func: Arc::new(move |interp: &mut Interpreter, task: &mut Task, args: &[String]| {
            instance_command(interp, task, &target, args)
        }),
        help: interp.objects.show_object(id).unwrap_or_default(),
    }
}

/// Run `<validator> {*} [args list]` against `value`.
fn validate(
    interp: &mut Interpreter,
    task: &mut Task,
    var: &str,
    validator: &str,
    value: &str,
    label: &str,
) -> Result<(), Signal> {
    let call = format!("{validator} {SPLAT} [args list]");
    let sig = interp.evaluate(task, &call, vec![value.to_owned()], Some(validator));
    if sig.is_abort() {
        return Err(task.error(
            format!(
                "error in type validator {var} <{validator}> = {value}.\n{}",
                sig.payload()
            ),
            label,
        ));
    }
    if !value::is_true(sig.payload()) {
        return Err(task.error(
            format!("value is not valid for type {var} <{validator}> = {value}."),
            label,
        ));
    }
    Ok(())
}

/// Dispatch a directive to the instance `id`.
pub fn instance_command(
    interp: &mut Interpreter,
    task: &mut Task,
    id: &str,
    args: &[String],
) -> Signal {
    let Some(instance) = interp.objects.instance(id).cloned() else {
        return task.error(format!("object {id} doesn't exist"), "object");
    };
    let Some(class) = interp.objects.class(&instance.class).cloned() else {
        return task.error(
            format!("object is of class {} which doesn't exist.", instance.class),
            "object",
        );
    };
    let Some(directive) = args.first() else {
        return task.error("object needs a directive", "object");
    };

    match directive.as_str() {
        "get" => {
            let Some(var) = args.get(1) else {
                return task.error("object get needs a varname", "object");
            };
            match instance.vars.get(var) {
                Some(value) => Signal::ok(value.as_str()),
                None => task.error(
                    format!("object {} has no member variable {var}", instance.id),
                    "object",
                ),
            }
        }
        "set" => {
            let Some(var) = args.get(1) else {
                return task.error("object set needs a varname", "object");
            };
            let Some(value) = args.get(2) else {
                return task.error("object set needs a value", "object");
            };
            if let Some(spec) = class.vars.get(var) {
                if let Err(sig) = validate(interp, task, var, &spec.validator, value, "object") {
                    return sig;
                }
            }
            // The validator may have deleted the instance.
            if let Some(live) = interp.objects.objects.get_mut(&instance.id) {
                live.vars.insert(var.clone(), value.clone());
            }
            Signal::empty()
        }
        "id" => Signal::ok(instance.id),
        "show" => Signal::Normal(interp.objects.show_object(&instance.id).unwrap_or_default()),
        "show-class" => Signal::Normal(interp.objects.show_class(&class.name).unwrap_or_default()),
        "class" => Signal::ok(instance.class),
        "delete" => {
            interp.objects.remove(&instance.id);
            Signal::empty()
        }
        method if class.methods.contains_key(method) => {
            let body = &class.methods[method];
            let handle = self_handle(interp, &instance.id);
            let mut scope = interp.bind_handle("self", handle);
            scope.evaluate(task, body, args[1..].to_vec(), Some(method))
        }
        var => match instance.vars.get(var) {
            Some(value) => Signal::ok(value.as_str()),
            None => task.error(format!("directive {var} is undefined"), "object"),
        },
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// `class <name> [var <n> <validator> <init>]... [method <n> <body>]...
/// [proc <n> <params> <body>]... [constructor <body>] [helps <text>]`
fn class(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    let mut words = args.iter();
    let Some(name) = words.next() else {
        return task.error("class needs a name", "class");
    };
    let mut class = Class {
        name: name.clone(),
        ..Class::default()
    };
    while let Some(keyword) = words.next() {
        match keyword.to_ascii_lowercase().as_str() {
            "var" => {
                let (Some(var), Some(validator), Some(initial)) =
                    (words.next(), words.next(), words.next())
                else {
                    return task.error("var needs a name, a validator and an initial value", "class var");
                };
                class.vars.insert(
                    var.clone(),
                    VarSpec {
                        validator: validator.clone(),
                        initial: initial.clone(),
                    },
                );
            }
            "method" => {
                let (Some(method), Some(body)) = (words.next(), words.next()) else {
                    return task.error("method needs a name and a body", "class method");
                };
                class.methods.insert(method.clone(), body.clone());
            }
            "proc" => {
                let (Some(method), Some(params), Some(body)) =
                    (words.next(), words.next(), words.next())
                else {
                    return task.error("proc needs a name, a parameter list and a body", "class proc");
                };
                let quoted: Vec<String> = value::unpack(params)
                    .iter()
                    .map(|p| format!("'{}'", value::escape(p)))
                    .collect();
                class
                    .methods
                    .insert(method.clone(), format!("args map {}\n{body}", quoted.join(" ")));
            }
            "constructor" => {
                let Some(body) = words.next() else {
                    return task.error("constructor needs a body", "class constructor");
                };
                class.constructor = body.clone();
            }
            "helps" => {
                let Some(text) = words.next() else {
                    return task.error("helps needs a helpstring", "class helps");
                };
                class.help = text.clone();
            }
            _ => {}
        }
    }
    debug!(class = %class.name, vars = class.vars.len(), methods = class.methods.len(), "class defined");
    interp.objects.add_class(class);
    Signal::empty()
}

/// `new <class> [<instance-name>] [<args>...]`
fn new(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    let Some(class_name) = args.first() else {
        return task.error("a class name is needed", "new");
    };
    let Some(class) = interp.objects.class(class_name).cloned() else {
        return task.error(format!("class {class_name} does not exist"), "new");
    };
    let label = format!("new {class_name}");
    let instance = Instance {
        id: interp.objects.next_id(class_name),
        name: args.get(1).filter(|n| !n.is_empty()).cloned(),
        class: class_name.clone(),
        vars: class
            .vars
            .iter()
            .map(|(k, spec)| (k.clone(), spec.initial.clone()))
            .collect(),
    };
    let id = instance.id.clone();
    let rest = args.get(2..).unwrap_or_default();

    if !class.constructor.is_empty() {
        interp.objects.insert(instance);
        let handle = self_handle(interp, &id);
        let sig = {
            let mut scope = interp.bind_handle("self", handle);
            scope.evaluate(task, &class.constructor, rest.to_vec(), Some(label.as_str()))
        };
        if sig.is_abort() {
            interp.objects.remove(&id);
        }
        return sig;
    }

    let mut instance = instance;
    let mut pairs = rest.iter();
    while let Some(var) = pairs.next() {
        let value = pairs.next().map_or("", String::as_str);
        let Some(spec) = class.vars.get(var) else {
            return task.error(format!("class {class_name} has no variable {var}"), &label);
        };
        if let Err(sig) = validate(interp, task, var, &spec.validator, value, &label) {
            return sig;
        }
        instance.vars.insert(var.clone(), value.to_owned());
    }
    interp.objects.insert(instance);
    Signal::ok(id)
}

/// `object <id|name> <directive> [<args>...]`
fn object(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    let Some(target) = args.first() else {
        return task.error("object command needs an id", "object");
    };
    match interp.objects.resolve_id(target) {
        Some(id) => instance_command(interp, task, &id, &args[1..]),
        None => task.error(format!("object {target} doesn't exist"), "object"),
    }
}

fn object_type(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    if args.is_empty() {
        return task.error("object-type needs an object id", "object-type");
    }
    Signal::ok(
        interp
            .objects
            .instance(arg(args, 0))
            .map_or("", |i| i.class.as_str()),
    )
}

fn classes(interp: &mut Interpreter, _: &mut Task, _: &[String]) -> Signal {
    Signal::ok(pack(interp.objects.class_names()))
}

fn objects(interp: &mut Interpreter, _: &mut Task, _: &[String]) -> Signal {
    Signal::ok(pack(interp.objects.instance_ids()))
}

const CLASS_HELP: &str = r#"usage:
  class <class-name> \
    [var <var-name> <validator> <initial-value>]... \
    [method <method-name> <method-body>]... \
    [proc <method-name> <params> <method-body>]... \
    [constructor <constructor-body>] \
    [helps <help-text>]

define a class.  A validator is a command called with the new value; an
empty result rejects it.  proc methods bind their params with args map.
Methods and the constructor see the instance as the `self` command.

example:
  class counter \
    var count integer? 0 \
    constructor { self set count [args 1] } \
    method bump { self set count [+ 1 [self get count]] ; self get count }
  new counter c 5
  c bump
  object c get count"#;

const COMMANDS: &[(&str, Builtin, &str)] = &[
    ("class", class, CLASS_HELP),
    ("new", new, "usage:\n  new <class> [<instance-name>] [<args>...]\ncreate an instance, optionally bound to <instance-name>.\nwith a constructor, <args> go to it and its result is returned;\notherwise <args> are <var> <value> pairs and the id is returned."),
    ("object", object, "usage:\n  object <object-id> [<args>...]\nsame as <object-id> <args>..."),
    ("object-type", object_type, "usage:\n  object-type <object-id>\nreturn the class of the object, or an empty string."),
    ("classes", classes, "usage:\n  classes\nlist the defined classes."),
    ("objects", objects, "usage:\n  objects\nlist the ids of the live objects."),
];

pub fn register(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.add_table(COMMANDS)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
