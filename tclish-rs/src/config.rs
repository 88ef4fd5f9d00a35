//! Settings file parser.
//!
//! The file holds `key = value` lines:
//!
//! | Key           | Value                                        |
//! |---------------|----------------------------------------------|
//! | `stack_limit` | frames per task, 1 to [`MAX_STACK_LIMIT`]    |
//! | `stdlib`      | `true`/`false`: register the command library |
//! | `prompt`      | REPL prompt                                  |
//! | `log`         | default log filter, e.g. `tclish=debug`      |
//!
//! Lines starting with `#` are comments.  Bad lines are reported and
//! skipped; they never stop the rest of the file from loading.
//!
//! The file is looked up as `config` in the platform config directory
//! (`~/.config/tclish/config` on Linux), then `./.tclishrc.conf`.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use thiserror::Error;
use tracing::{info, warn};

use crate::script::interp::InterpConfig;
use crate::script::task::DEFAULT_STACK_LIMIT;

/// Largest accepted stack limit.
pub const MAX_STACK_LIMIT: usize = 512;

/// Environment variable overriding `stack_limit`.
pub const STACK_LIMIT_ENV: &str = "TCLISH_STACK_LIMIT";

pub const DEFAULT_PROMPT: &str = "> ";

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal problem found while loading settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("line {line}: {message}")]
    Line { line: usize, message: String },
    #[error("{var}: {message}")]
    Env { var: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub stack_limit: usize,
    pub stdlib: bool,
    pub prompt: String,
    /// Filter directive used when `TCLISH_LOG` is unset.
    pub log: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            stack_limit: DEFAULT_STACK_LIMIT,
            stdlib: true,
            prompt: DEFAULT_PROMPT.to_owned(),
            log: None,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings text on top of the defaults.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut settings = Settings::new();
        let errors = settings.merge_str(s);
        (settings, errors)
    }

    /// Read and parse a settings file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    /// Apply every valid line of `s`, returning the rejected ones.
    pub fn merge_str(&mut self, s: &str) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        for (i, raw) in s.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let result = match line.split_once('=') {
                Some((key, value)) => self.set(key.trim(), value.trim()),
                None => Err(format!("expected `key = value`, got `{line}`")),
            };
            if let Err(message) = result {
                errors.push(ConfigError::Line { line: i + 1, message });
            }
        }
        errors
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "stack_limit" => self.stack_limit = parse_stack_limit(value)?,
            "stdlib" => self.stdlib = parse_bool(value)?,
            "prompt" => self.prompt = unquote(value).to_owned(),
            "log" => self.log = Some(value.to_owned()).filter(|v| !v.is_empty()),
            _ => return Err(format!("unknown key `{key}`")),
        }
        Ok(())
    }

    /// Apply `TCLISH_STACK_LIMIT` when set.
    pub fn apply_env(&mut self) -> Option<ConfigError> {
        let value = std::env::var(STACK_LIMIT_ENV).ok()?;
        self.apply_stack_limit_override(&value)
    }

    fn apply_stack_limit_override(&mut self, value: &str) -> Option<ConfigError> {
        match parse_stack_limit(value.trim()) {
            Ok(limit) => {
                self.stack_limit = limit;
                None
            }
            Err(message) => Some(ConfigError::Env { var: STACK_LIMIT_ENV, message }),
        }
    }

    pub fn interp_config(&self) -> InterpConfig {
        InterpConfig {
            stack_limit: self.stack_limit,
            load_stdlib: self.stdlib,
        }
    }
}

fn parse_stack_limit(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(n) if (1..=MAX_STACK_LIMIT).contains(&n) => Ok(n),
        Ok(n) => Err(format!("stack_limit {n} is outside 1..={MAX_STACK_LIMIT}")),
        Err(_) => Err(format!("stack_limit must be an integer, got `{value}`")),
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(format!("expected true or false, got `{value}`")),
    }
}

/// Strip one pair of matching quotes so a prompt can keep trailing spaces.
fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(q).and_then(|v| v.strip_suffix(q)) {
            return inner;
        }
    }
    value
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Candidate settings files, in search order.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dirs) = ProjectDirs::from("", "", "tclish") {
        paths.push(dirs.config_dir().join("config"));
    }
    paths.push(PathBuf::from("./.tclishrc.conf"));
    paths
}

/// The first settings file that exists.
pub fn find_config() -> Option<PathBuf> {
    config_paths().into_iter().find(|p| p.exists())
}

/// Outcome of [`load`]: the settings plus anything worth logging once a
/// subscriber is installed.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub settings: Settings,
    /// The file the settings came from, if one was read.
    pub path: Option<PathBuf>,
    pub problems: Vec<String>,
}

impl LoadReport {
    pub fn log(&self) {
        if let Some(p) = &self.path {
            info!(path = %p.display(), "loaded settings");
        }
        for problem in &self.problems {
            warn!("{problem}");
        }
    }
}

/// Load settings from `path` (or the first file found), then apply the
/// environment.  Problems are collected and skipped.
pub fn load(path: Option<&Path>) -> LoadReport {
    let mut report = LoadReport::default();
    if let Some(p) = path.map(Path::to_path_buf).or_else(find_config) {
        match Settings::load_file(&p) {
            Ok((settings, errors)) => {
                report.settings = settings;
                report
                    .problems
                    .extend(errors.iter().map(|e| format!("{}: {e}", p.display())));
                report.path = Some(p);
            }
            Err(e) => report.problems.push(format!("cannot read {}: {e}", p.display())),
        }
    }
    if let Some(e) = report.settings.apply_env() {
        report.problems.push(e.to_string());
    }
    report
}

// ── Tests ─────────────────────────────────────────────────────────────────────
