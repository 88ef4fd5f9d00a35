//! The tclish language core.
//!
//! Data flows one way while parsing and recursively while substituting:
//!
//! ```text
//!   program text ─► stmt::split ─► Sentence ─► expand::resolve ─► String
//!                       │                            │
//!                   scan::scan                 [cmd] substitution
//!                                                    │
//!                                   Interpreter::simple_evaluate (recursive)
//! ```
//!
//! - [`scan`]: the quoting scanner (pure, byte offsets in, byte offsets out)
//! - [`stmt`]: the sentence splitter
//! - [`expand`]: the word resolver (unescaping, `$var`, `[cmd]`)
//! - [`task`]: the bounded frame stack a running program owns
//! - [`interp`]: the evaluator and its namespace dispatch chain
//! - [`primitives`]: the fixed, non-overridable primitive table
//! - [`builtins`], [`math`], [`strings`]: the native command library
//!
//! # Quick start
//!
//! ```rust
//! use tclish::script::{Interpreter, Signal, Task};
//!
//! let mut interp = Interpreter::new();
//! let mut task = Task::default();
//! let sig = interp.evaluate(&mut task, "set x 6\n* $x 7", Vec::new(), None);
//! assert_eq!(sig, Signal::Normal("42".into()));
//! ```

pub mod builtins;
pub mod expand;
pub mod interp;
pub mod math;
pub mod primitives;
pub mod scan;
pub mod signal;
pub mod stmt;
pub mod strings;
pub mod task;
pub mod value;

// Re-exports for convenience.
pub use builtins::{CommandRegistry, NativeFn};
pub use interp::{Interpreter, InterpConfig, Namespace, DISPATCH_ORDER};
pub use signal::Signal;
pub use task::{Frame, Task, DEFAULT_STACK_LIMIT};
