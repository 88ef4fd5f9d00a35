//! Command-line argument parsing.
//!
//! Usage:
//!   tclish [-f<file>] [-c<cmd>] [-s<depth>] [-nqd] [--] [<args>...]
//!
//! Everything after the options (or after `--`) becomes the positional
//! arguments of the top-level frame, so a script reads them with `args`.

use std::path::PathBuf;

use thiserror::Error;

pub const USAGE: &str = "Usage: tclish [-f<file>] [-c<cmd>] [-s<depth>] [-nqd] [--] [<args>...]";

// ── Public types ──────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("-{0} requires an argument")]
    MissingValue(char),
    #[error("unknown option: -{0}")]
    UnknownOption(char),
    #[error("invalid stack depth: {0}")]
    InvalidDepth(String),
}

/// Parsed command-line arguments.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliArgs {
    /// Script file to run (`-f<file>`).
    pub script: Option<PathBuf>,
    /// Command string to run (`-c<cmd>`).
    pub command: Option<String>,
    /// Stack limit override (`-s<depth>`).
    pub stack_limit: Option<usize>,
    /// Skip the command library (`-n`).
    pub no_stdlib: bool,
    /// No banner (`-q`).
    pub quiet: bool,
    /// Debug logging (`-d`).
    pub debug: bool,
    /// Positional arguments for the top-level frame.
    pub args: Vec<String>,
}

impl CliArgs {
    /// True when neither `-f` nor `-c` was given, so stdin drives a REPL.
    pub fn interactive(&self) -> bool {
        self.script.is_none() && self.command.is_none()
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()`.
pub fn parse_args() -> Result<CliArgs, CliError> {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    parse_argv(&raw)
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, CliError> {
    let mut args = CliArgs::default();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        if arg == "--" {
            args.args.extend(argv[i + 1..].iter().cloned());
            break;
        }

        // The first non-option starts the positional arguments.
        if !arg.starts_with('-') || arg == "-" {
            args.args.extend(argv[i..].iter().cloned());
            break;
        }

        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            let flag = chars[j];
            match flag {
                'n' => args.no_stdlib = true,
                'q' => args.quiet = true,
                'd' => args.debug = true,
                'f' | 'c' | 's' => {
                    // Value is the rest of this argument, or the next one.
                    let value = if j + 1 < chars.len() {
                        chars[j + 1..].iter().collect()
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err(CliError::MissingValue(flag));
                    };
                    j = chars.len();
                    match flag {
                        'f' => args.script = Some(PathBuf::from(value)),
                        'c' => args.command = Some(value),
                        _ => args.stack_limit = Some(parse_depth(&value)?),
                    }
                    continue;
                }
                c => return Err(CliError::UnknownOption(c)),
            }
            j += 1;
        }
        i += 1;
    }

    Ok(args)
}

fn parse_depth(value: &str) -> Result<usize, CliError> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CliError::InvalidDepth(value.to_owned())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
