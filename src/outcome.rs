//! Result of a lifecycle run that did not fail outright.

use log::{error, warn};

/// Overall status of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    /// Completed, but something the user should look at was reported.
    Warnings,
    /// Completed, but part of the requested work was skipped.
    Errors,
}

/// Problems collected while a run completes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl Outcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a warning and remember it for the final status.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    /// Log an error that did not stop the run.
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.errors.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn status(&self) -> Status {
        if !self.errors.is_empty() {
            Status::Errors
        } else if !self.warnings.is_empty() {
            Status::Warnings
        } else {
            Status::Success
        }
    }

    pub fn merge(&mut self, other: Outcome) {
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
    }
}

/// Join words for a sentence: `a`, `a and b`, `a, b, and c`.
pub fn oxford_join<S: AsRef<str>>(words: &[S]) -> String {
    match words {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [first, second] => format!("{} and {}", first.as_ref(), second.as_ref()),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(AsRef::as_ref).collect();
            format!("{}, and {}", head.join(", "), last.as_ref())
        }
    }
}
