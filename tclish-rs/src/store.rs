//! Hierarchical key/value store.
//!
//! Keys are paths of string segments.  Every node may carry a value and any
//! number of children, so `user` and `user profile` can both hold values:
//!
//! ```text
//! * user -- alice
//!   * profile
//!     * name -- Alice
//! ```
//!
//! The interpreter reads single-segment paths as a fallback for unbound
//! variables; scripts reach the rest through the `db` command.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::script::builtins::{CommandRegistry, RegistryError};
use crate::script::value::{bool_str, pack};
use crate::script::{Interpreter, Signal, Task};

/// Operations every store backend provides.
pub trait Store: Send {
    /// The value at `path`, or `""`.
    fn get(&self, path: &[String]) -> String;
    fn set(&mut self, path: &[String], value: &str);
    /// True when `path` holds a value (children alone do not count).
    fn has(&self, path: &[String]) -> bool;
    /// Names of the direct children of `path`, sorted.
    fn list(&self, path: &[String]) -> Vec<String>;
    /// Drop the value at `path`, keeping its children.
    fn unset(&mut self, path: &[String]);
    /// Drop `path` and everything below it.  The root cannot be pruned.
    fn prune(&mut self, path: &[String]) -> bool;

    /// Render the subtree under `path`, one `* key -- value` line per node.
    fn show(&self, path: &[String]) -> String {
        let mut out = String::new();
        render(self, &mut path.to_vec(), "", &mut out, &|store, p| {
            if store.has(p) {
                format!(" -- {}", store.get(p))
            } else {
                String::new()
            }
        });
        out
    }

    /// Like [`show`](Store::show) but marks valued nodes with `*` instead of
    /// printing the value.
    fn tree(&self, path: &[String]) -> String {
        let mut out = String::new();
        render(self, &mut path.to_vec(), "", &mut out, &|store, p| {
            if store.has(p) {
                " *".to_owned()
            } else {
                String::new()
            }
        });
        out
    }
}

type Marker<S> = dyn Fn(&S, &[String]) -> String;

fn render<S: Store + ?Sized>(
    store: &S,
    path: &mut Vec<String>,
    indent: &str,
    out: &mut String,
    marker: &Marker<S>,
) {
    let child_indent = format!("{indent}  ");
    for key in store.list(path) {
        out.push_str(&format!("{indent}* {key}"));
        path.push(key);
        out.push_str(&marker(store, path));
        out.push('\n');
        render(store, path, &child_indent, out, marker);
        path.pop();
    }
}

// ── In-memory engine ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
struct Node {
    value: Option<String>,
    children: BTreeMap<String, Node>,
}

impl Node {
    fn find(&self, path: &[String]) -> Option<&Node> {
        path.iter().try_fold(self, |node, key| node.children.get(key))
    }

    fn find_mut(&mut self, path: &[String]) -> Option<&mut Node> {
        path.iter()
            .try_fold(self, |node, key| node.children.get_mut(key))
    }
}

/// A store held entirely in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    root: Node,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, path: &[String]) -> String {
        self.root
            .find(path)
            .and_then(|n| n.value.clone())
            .unwrap_or_default()
    }

    fn set(&mut self, path: &[String], value: &str) {
        let node = path.iter().fold(&mut self.root, |node, key| {
            node.children.entry(key.clone()).or_default()
        });
        node.value = Some(value.to_owned());
    }

    fn has(&self, path: &[String]) -> bool {
        self.root.find(path).is_some_and(|n| n.value.is_some())
    }

    fn list(&self, path: &[String]) -> Vec<String> {
        self.root
            .find(path)
            .map(|n| n.children.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn unset(&mut self, path: &[String]) {
        if let Some(node) = self.root.find_mut(path) {
            node.value = None;
        }
    }

    fn prune(&mut self, path: &[String]) -> bool {
        let Some((last, parent)) = path.split_last() else {
            return false;
        };
        if let Some(node) = self.root.find_mut(parent) {
            node.children.remove(last);
        }
        true
    }
}

// ── db command ────────────────────────────────────────────────────────────────

const DB_HELP: &str = "usage:
  db get <fields...>
  db set <fields...> <value>
  db unset <fields...>
  db has <fields...>
  db list <fields...>
  db prune <fields...>
  db show <fields...>
  db tree <fields...>
read and write the hierarchical store.  <fields> name a path from the root,
so `db set user profile name Alice` stores Alice under user/profile/name.
show prints the subtree with values, tree marks valued keys with `*`.";

fn db(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    let Some((sub, path)) = args.split_first() else {
        return task.error("missing command for 'db'", "db");
    };
    let store = interp.store_mut();
    match sub.to_ascii_lowercase().as_str() {
        "get" => Signal::Normal(store.get(path)),
        "set" => match path.split_last() {
            Some((value, keys)) => {
                store.set(keys, value);
                Signal::ok(value.as_str())
            }
            None => task.error("db set requires a value", "db"),
        },
        "unset" => {
            store.unset(path);
            Signal::empty()
        }
        "has" => Signal::ok(bool_str(store.has(path))),
        "list" => Signal::ok(pack(store.list(path))),
        "prune" => {
            if store.prune(path) {
                Signal::empty()
            } else {
                task.error("cannot prune the whole store, prune each top-level key", "db")
            }
        }
        "show" => Signal::Normal(store.show(path)),
        "tree" => Signal::Normal(store.tree(path)),
        other => task.error(format!("unknown 'db' command '{other}'"), "db"),
    }
}

pub fn register(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.add("db", Arc::new(db), DB_HELP)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
