//! tclish: an embeddable interpreter for a small Tcl-family scripting
//! language.
//!
//! Programs are whitespace-separated sentences of words.  Words come in five
//! lexical forms (bare, `'single'`, `"double"`, `[command]`, `{literal}`),
//! every value is a string, and control flow travels through a four-state
//! [`Signal`](script::Signal) instead of Rust errors.
//!
//! The [`script`] module holds the language core.  The surrounding modules
//! supply the collaborators the core dispatches to: the hierarchical
//! [`store`], the [`object`] system, the event [`scheduler`], and the
//! pieces the `tclish` binary needs ([`cli`], [`config`], [`event_loop`]).

pub mod cli;
pub mod config;
pub mod event_loop;
pub mod object;
pub mod pattern;
pub mod scheduler;
pub mod script;
pub mod store;
