//! The four-state control-flow signal.

/// Result of every evaluation step.
///
/// `Normal` carries an ordinary value.  `Comment` marks a sentence that
/// produced nothing and leaves the running result alone.  `ForcedReturn`
/// and `Error` abort the rest of the sentence list they occur in; the
/// nearest [`evaluate`](super::Interpreter::evaluate) boundary turns a
/// `ForcedReturn` back into `Normal`, while `Error` only stops at a
/// catching command such as `try`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Normal(String),
    Comment(String),
    ForcedReturn(String),
    Error(String),
}

impl Signal {
    pub fn ok(value: impl Into<String>) -> Self {
        Signal::Normal(value.into())
    }

    pub fn empty() -> Self {
        Signal::Normal(String::new())
    }

    /// `Error` or `ForcedReturn`.
    pub fn is_abort(&self) -> bool {
        matches!(self, Signal::Error(_) | Signal::ForcedReturn(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Signal::Error(_))
    }

    pub fn payload(&self) -> &str {
        match self {
            Signal::Normal(s) | Signal::Comment(s) | Signal::ForcedReturn(s) | Signal::Error(s) => s,
        }
    }

    pub fn into_payload(self) -> String {
        match self {
            Signal::Normal(s) | Signal::Comment(s) | Signal::ForcedReturn(s) | Signal::Error(s) => s,
        }
    }

    /// Convert a `ForcedReturn` into `Normal`; everything else passes
    /// through unchanged.
    pub fn absorb_return(self) -> Self {
        match self {
            Signal::ForcedReturn(s) => Signal::Normal(s),
            other => other,
        }
    }
}
