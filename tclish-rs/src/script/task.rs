//! Tasks and their frame stacks.
//!
//! A [`Task`] is one running program.  It owns a bounded stack of
//! [`Frame`]s; each frame holds the positional arguments of the scope that
//! created it, its variable bindings, and a label used in error traces.
//! Writes go to the top frame, reads walk from the top down.

use std::collections::HashMap;

use super::signal::Signal;

/// Frames a task may hold before `push` starts failing.
pub const DEFAULT_STACK_LIMIT: usize = 64;

/// Nested evaluations (`[..]` substitutions, bodies, calls) a task may have
/// in progress at once.
pub const MAX_NESTING: usize = 512;

// ── Frame ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub args: Vec<String>,
    pub vars: HashMap<String, String>,
    pub label: String,
}

impl Frame {
    pub fn new(args: Vec<String>, label: impl Into<String>) -> Self {
        Frame {
            args,
            vars: HashMap::new(),
            label: label.into(),
        }
    }
}

// ── Task ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Task {
    frames: Vec<Frame>,
    limit: usize,
    nesting: usize,
}

impl Default for Task {
    fn default() -> Self {
        Task::new(DEFAULT_STACK_LIMIT)
    }
}

impl Task {
    /// An empty task allowing `limit` frames.
    pub fn new(limit: usize) -> Self {
        Task {
            frames: Vec::new(),
            limit,
            nesting: 0,
        }
    }

    /// A task with one long-lived base frame, for sessions that evaluate
    /// several programs against the same top-level variables.
    pub fn with_base(limit: usize, args: Vec<String>, label: impl Into<String>) -> Self {
        let mut task = Task::new(limit);
        task.frames.push(Frame::new(args, label));
        task
    }

    /// A new task seeded with a copy of this task's base frame.
    pub fn fork(&self) -> Task {
        Task {
            frames: self.frames.first().cloned().into_iter().collect(),
            limit: self.limit,
            nesting: 0,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Push a frame.  Returns `false` without touching the stack when the
    /// task is already at its limit.
    pub fn push(&mut self, args: Vec<String>, label: impl Into<String>) -> bool {
        if self.frames.len() >= self.limit {
            return false;
        }
        self.frames.push(Frame::new(args, label));
        true
    }

    pub fn nesting(&self) -> usize {
        self.nesting
    }

    /// Enter one level of nested evaluation.  Returns `false` without
    /// counting it once [`MAX_NESTING`] levels are open.
    pub fn enter(&mut self) -> bool {
        if self.nesting >= MAX_NESTING {
            return false;
        }
        self.nesting += 1;
        true
    }

    pub fn leave(&mut self) {
        self.nesting = self.nesting.saturating_sub(1);
    }

    /// Pop the top frame.  Returns `false` on an empty stack.
    pub fn pop(&mut self) -> bool {
        self.frames.pop().is_some()
    }

    /// Look a variable up from the top frame down.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.vars.get(name))
            .map(String::as_str)
    }

    /// Bind a variable in the top frame.  Returns `false` if there is none.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.vars.insert(name.into(), value.into());
                true
            }
            None => false,
        }
    }

    /// Overwrite the nearest existing binding of `name`, or bind it in the
    /// top frame when no frame has it.
    pub fn update(&mut self, name: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        for frame in self.frames.iter_mut().rev() {
            if let Some(slot) = frame.vars.get_mut(name) {
                *slot = value;
                return true;
            }
        }
        self.set(name, value)
    }

    /// Remove a binding from the top frame only.
    pub fn unset(&mut self, name: &str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.vars.remove(name);
        }
    }

    /// Positional arguments of the top frame.
    pub fn args(&self) -> &[String] {
        self.frames
            .last()
            .map(|f| f.args.as_slice())
            .unwrap_or_default()
    }

    pub fn label(&self) -> Option<&str> {
        self.frames.last().map(|f| f.label.as_str())
    }

    /// Build an `Error` signal carrying `<label> message` and a trace of
    /// every frame label, innermost first.
    pub fn error(&self, message: impl AsRef<str>, label: impl AsRef<str>) -> Signal {
        let mut text = format!("<{}> {}", label.as_ref(), message.as_ref());
        if let Some(top) = self.frames.last() {
            text.push_str(&format!("\nwhile evaluating:{{{}}}\nstack:", top.label));
            for (i, frame) in self.frames.iter().rev().enumerate() {
                text.push_str(&format!("\n{i:>4}: {{{}}}", frame.label));
            }
        }
        Signal::Error(text)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
