//! Main async event loop.
//!
//! Drives one interpreter session: program text from `-f`/`-c`, lines from
//! stdin in REPL mode, and the deferred events scripts queue with
//! `schedule-event`.
//!
//! ```text
//!   ┌──────────────────────────┐
//!   │  EventLoop::run_repl()   │
//!   │  tokio::select! over:    │
//!   │  • stdin lines           │◄── reader thread
//!   │  • next event deadline   │
//!   │  • SIGINT / SIGTERM      │
//!   └──────────────────────────┘
//! ```
//!
//! Script mode ([`EventLoop::run_events`]) keeps only the timer and signal
//! branches and returns once the queue drains.

use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::time::sleep_until;
use tracing::debug;

use crate::script::interp::{Interpreter, LoadError};
use crate::script::{Signal, Task};

/// Events run per wakeup before input gets another turn.
const EVENTS_PER_TICK: usize = 64;

/// Deadline used when nothing is scheduled.
const IDLE_WAIT: Duration = Duration::from_secs(3600);

// ── Input ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    Eof,
}

/// Read stdin lines on a dedicated thread.
///
/// A blocking reader owned by one thread keeps lines in order; a
/// `spawn_blocking` read dropped by `select!` would leave an orphaned
/// reader competing for the same fd.
pub fn spawn_stdin_reader() -> mpsc::Receiver<Input> {
    let (tx, rx) = mpsc::channel::<Input>(16);
    std::thread::spawn(move || {
        use std::io::BufRead;
        let stdin = std::io::stdin();
        let mut guard = stdin.lock();
        loop {
            let mut line = String::new();
            match guard.read_line(&mut line) {
                Ok(0) | Err(_) => {
                    let _ = tx.blocking_send(Input::Eof);
                    break;
                }
                Ok(_) => {
                    let trimmed = line.trim_end_matches(['\n', '\r']).to_owned();
                    if tx.blocking_send(Input::Line(trimmed)).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

/// True when `text` leaves no brace, bracket or quote open and does not end
/// in a line-continuation backslash.  Follows the scanner: braces only nest
/// braces, and escapes count only inside quotes.
pub fn is_complete(text: &str) -> bool {
    if text.trim_end().ends_with('\\') {
        return false;
    }
    let bytes = text.as_bytes();
    let mut open: Vec<u8> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match (open.last().copied(), b) {
            (Some(b'{'), b'{') => open.push(b),
            (Some(b'{'), b'}') => {
                open.pop();
            }
            (Some(b'{'), _) => {}
            (Some(b'\'' | b'"'), b'\\') => i += 1,
            (Some(q @ (b'\'' | b'"')), _) if b == q => {
                open.pop();
            }
            (Some(b'"'), b'[') => open.push(b),
            (Some(b'\''), _) | (Some(b'"'), _) => {}
            (_, b'{' | b'[' | b'\'' | b'"') => open.push(b),
            (Some(b'['), b']') => {
                open.pop();
            }
            _ => {}
        }
        i += 1;
    }
    open.is_empty()
}

// ── EventLoop ─────────────────────────────────────────────────────────────────

/// One interpreter session and the task its top-level input runs in.
pub struct EventLoop<W = Stdout> {
    pub interp: Interpreter,
    task: Task,
    prompt: String,
    show_prompt: bool,
    out: W,
    /// True once any top-level evaluation has failed.
    failed: bool,
}

impl EventLoop<Stdout> {
    pub fn new(interp: Interpreter, task: Task) -> Self {
        EventLoop::with_writer(interp, task, tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin> EventLoop<W> {
    pub fn with_writer(interp: Interpreter, task: Task, out: W) -> Self {
        EventLoop {
            interp,
            task,
            prompt: String::new(),
            show_prompt: false,
            out,
            failed: false,
        }
    }

    /// Show `prompt` before each REPL line when `show` is set.
    pub fn set_prompt(&mut self, prompt: impl Into<String>, show: bool) {
        self.prompt = prompt.into();
        self.show_prompt = show;
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn quit_requested(&self) -> bool {
        self.interp.quit_requested()
    }

    /// Evaluate program text in the session task and print its output.
    pub async fn run_source(&mut self, src: &str) -> io::Result<Signal> {
        let sig = self.interp.eval_in_place(&mut self.task, src);
        self.report(&sig);
        self.flush().await?;
        Ok(sig)
    }

    /// Load and evaluate a script file.
    pub async fn run_file(&mut self, path: &Path) -> io::Result<Result<Signal, LoadError>> {
        match self.interp.load_file(&path.to_string_lossy()) {
            Ok(src) => self.run_source(&src).await.map(Ok),
            Err(e) => {
                self.failed = true;
                Ok(Err(e))
            }
        }
    }

    fn report(&mut self, sig: &Signal) {
        if let Signal::Error(msg) = sig {
            self.failed = true;
            eprintln!("error: {msg}");
        }
    }

    async fn flush(&mut self) -> io::Result<()> {
        let text = self.interp.take_output();
        if !text.is_empty() {
            self.out.write_all(text.as_bytes()).await?;
        }
        self.out.flush().await
    }

    async fn show_prompt(&mut self, continued: bool) -> io::Result<()> {
        if !self.show_prompt {
            return Ok(());
        }
        let prompt = if continued { "... " } else { self.prompt.as_str() };
        self.out.write_all(prompt.as_bytes()).await?;
        self.out.flush().await
    }

    async fn run_due_events(&mut self) -> io::Result<()> {
        let fired = self.interp.process_events(Instant::now(), EVENTS_PER_TICK);
        if fired > 0 {
            debug!(fired, pending = self.interp.events.len(), "processed events");
        }
        self.flush().await
    }

    fn deadline(&self) -> Instant {
        self.interp
            .events
            .next_wakeup()
            .unwrap_or_else(|| Instant::now() + IDLE_WAIT)
    }

    /// Run scheduled events until the queue drains, `exit` is called, or a
    /// termination signal arrives.
    pub async fn run_events(&mut self) -> io::Result<()> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        while !self.quit_requested() && !self.interp.events.is_empty() {
            let timer = sleep_until(self.deadline().into());
            tokio::pin!(timer);
            tokio::select! {
                _ = &mut timer => self.run_due_events().await?,
                _ = sigint.recv() => break,
                _ = sigterm.recv() => break,
            }
        }
        Ok(())
    }

    /// Interactive loop: evaluate each complete input, printing non-empty
    /// results, while still firing scheduled events.  Returns on EOF,
    /// `exit`, or a termination signal.
    pub async fn run_repl(&mut self, mut input: mpsc::Receiver<Input>) -> io::Result<()> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut pending = String::new();

        self.show_prompt(false).await?;
        while !self.quit_requested() {
            let timer = sleep_until(self.deadline().into());
            tokio::pin!(timer);
            tokio::select! {
                msg = input.recv() => {
                    let Some(Input::Line(line)) = msg else {
                        break;
                    };
                    if !pending.is_empty() {
                        pending.push('\n');
                    }
                    pending.push_str(&line);
                    if !is_complete(&pending) {
                        self.show_prompt(true).await?;
                        continue;
                    }
                    let src = std::mem::take(&mut pending);
                    let sig = self.run_source(&src).await?;
                    if let Signal::Normal(v) = &sig {
                        if !v.is_empty() && !self.quit_requested() {
                            self.out.write_all(format!("{v}\n").as_bytes()).await?;
                        }
                    }
                    if !self.quit_requested() {
                        self.show_prompt(false).await?;
                    }
                }
                _ = &mut timer => self.run_due_events().await?,
                _ = sigint.recv() => break,
                _ = sigterm.recv() => break,
            }
        }
        self.flush().await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
