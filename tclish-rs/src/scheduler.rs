//! Deferred events: `schedule-event`, `push-event` and `list-events`.
//!
//! [`EventQueue`] keeps pending events ordered by fire time, ties broken by
//! the order they were queued.  Each event owns a [`Task`] forked from the
//! task that scheduled it, plus a snapshot of the handles bound at that
//! moment, so a method can schedule `self ...` for later.
//!
//! The host drives the queue: [`EventQueue::next_wakeup`] gives the
//! `tokio::time::sleep_until` deadline and [`Interpreter::process_events`]
//! runs whatever is due.
//!
//! ```rust,ignore
//! loop {
//!     if let Some(deadline) = interp.events.next_wakeup() {
//!         sleep_until(deadline.into()).await;
//!     }
//!     interp.process_events(Instant::now(), usize::MAX);
//! }
//! ```

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::script::builtins::{Builtin, CommandRegistry, RegistryError};
use crate::script::interp::{Handle, Interpreter};
use crate::script::value::{pack, Number};
use crate::script::{Signal, Task};

/// Called with `<command> <error> <args>...` when an event fails.
pub const ON_EVENT_ERROR: &str = "on-event-error";

// ── Event ─────────────────────────────────────────────────────────────────────

/// A command waiting to run.
pub struct Event {
    pub fire_at: Instant,
    pub command: String,
    pub args: Vec<String>,
    task: Task,
    handles: Vec<(String, Handle)>,
    seq: u64,
}

impl Event {
    fn key(&self) -> (Instant, u64) {
        (self.fire_at, self.seq)
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the max-heap pops the earliest event first.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

// ── EventQueue ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct EventQueue {
    heap: BinaryHeap<Event>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(
        &mut self,
        fire_at: Instant,
        command: String,
        args: Vec<String>,
        task: Task,
        handles: Vec<(String, Handle)>,
    ) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Event {
            fire_at,
            command,
            args,
            task,
            handles,
            seq,
        });
    }

    /// Remove and return the earliest event if it is due at `now`.
    fn pop_due(&mut self, now: Instant) -> Option<Event> {
        if self.heap.peek()?.fire_at <= now {
            self.heap.pop()
        } else {
            None
        }
    }

    /// The soonest fire time, or `None` when nothing is queued.
    pub fn next_wakeup(&self) -> Option<Instant> {
        self.heap.peek().map(|e| e.fire_at)
    }

    /// Pending events, earliest first.
    pub fn pending(&self) -> Vec<&Event> {
        let mut events: Vec<&Event> = self.heap.iter().collect();
        events.sort_by_key(|e| e.key());
        events
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

// ── Interpreter integration ───────────────────────────────────────────────────

impl Interpreter {
    /// Queue `command` to run `delay` from now in a task forked from `task`.
    pub fn push_event(&mut self, task: &Task, delay: Duration, command: impl Into<String>, args: Vec<String>) {
        let handles = self.snapshot_handles();
        self.events
            .push(Instant::now() + delay, command.into(), args, task.fork(), handles);
    }

    fn snapshot_handles(&self) -> Vec<(String, Handle)> {
        self.handle_names()
            .filter_map(|name| self.handle(name).map(|h| (name.clone(), h.clone())))
            .collect()
    }

    /// Run up to `max` events due at `now`, stopping early once `exit` has
    /// been called.  Returns how many ran.
    ///
    /// A failing event queues `on-event-error` with the command, the error
    /// and the original arguments, unless the failing command was
    /// `on-event-error` itself.
    pub fn process_events(&mut self, now: Instant, max: usize) -> usize {
        let mut fired = 0;
        while fired < max && !self.quit_requested() {
            let Some(mut event) = self.events.pop_due(now) else {
                break;
            };
            fired += 1;
            debug!(command = %event.command, args = event.args.len(), "firing event");

            let mut shadowed = Vec::with_capacity(event.handles.len());
            for (name, handle) in &event.handles {
                shadowed.push((name.clone(), self.add_handle(name.clone(), handle.clone())));
            }
            let sig = self.do_codebody(&mut event.task, &event.command, event.args.clone());
            for (name, prev) in shadowed.into_iter().rev() {
                self.restore_handle(&name, prev);
            }

            if let Signal::Error(msg) = sig {
                if event.command == ON_EVENT_ERROR {
                    warn!(error = %msg, "{ON_EVENT_ERROR} handler failed");
                    continue;
                }
                warn!(command = %event.command, error = %msg, "event failed, queueing {ON_EVENT_ERROR}");
                let mut args = vec![event.command, msg];
                args.extend(event.args);
                self.events
                    .push(Instant::now(), ON_EVENT_ERROR.to_owned(), args, event.task, event.handles);
            }
        }
        fired
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn schedule_event(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    if args.len() < 2 {
        return task.error("timeout and event needed", "schedule-event");
    }
    let delay = Number::parse(&args[0])
        .map(|n| n.as_f64().max(0.0))
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok());
    let Some(delay) = delay else {
        return task.error("time must be a valid number of seconds", "schedule-event");
    };
    interp.push_event(task, delay, args[1].as_str(), args[2..].to_vec());
    Signal::empty()
}

fn push_event(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    let Some((command, rest)) = args.split_first() else {
        return task.error("event needed", "push-event");
    };
    interp.push_event(task, Duration::ZERO, command.as_str(), rest.to_vec());
    Signal::empty()
}

fn list_events(interp: &mut Interpreter, _: &mut Task, _: &[String]) -> Signal {
    let now = Instant::now();
    let items = interp.events.pending().into_iter().flat_map(|e| {
        let due = e.fire_at.saturating_duration_since(now).as_secs_f64();
        [e.command.clone(), Number::Float(due).to_string()]
    });
    Signal::ok(pack(items))
}

fn time(_: &mut Interpreter, _: &mut Task, _: &[String]) -> Signal {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();
    Signal::ok(Number::Float(secs).to_string())
}

const COMMANDS: &[(&str, Builtin, &str)] = &[
    ("schedule-event", schedule_event, "usage:\n  schedule-event <timeout> <command> <args>...\nrun <command> with <args> <timeout> seconds from now."),
    ("push-event", push_event, "usage:\n  push-event <command> <args>...\nsame as schedule-event 0 <command> {*} <args>."),
    ("list-events", list_events, "usage:\n  list-events\nreturn the pending events as a list of <command> <seconds until due> pairs."),
    ("time", time, "usage:\n  time\nreturn the current time in seconds since 1970."),
];

pub fn register(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.add_table(COMMANDS)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
