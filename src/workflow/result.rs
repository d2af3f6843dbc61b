//! Task Outcomes
//!
//! The leaf values of a workflow report: what a single task expected,
//! what it saw, and whether it ran at all.

use std::fmt;

use serde::Serialize;

/// Outcome status shared by task results and workflows.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Everything ran and passed
    Success,
    /// Something ran and failed
    Failure,
    /// Nothing ran because an earlier task failed
    Skipped,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failure => write!(f, "FAILURE"),
            Self::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// A failed check, produced by a task.
///
/// Immutable once created.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TaskError {
    expected: String,
    actual: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl TaskError {
    /// Creates an error describing a mismatch between expected and actual values.
    ///
    /// # Example
    ///
    /// ```
    /// use cloudcafe::workflow::TaskError;
    ///
    /// let error = TaskError::new("ACTIVE", "ERROR").with_message("server never became active");
    /// assert_eq!(error.expected(), "ACTIVE");
    /// assert_eq!(error.message(), Some("server never became active"));
    /// ```
    pub fn new(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            actual: actual.into(),
            message: None,
        }
    }

    /// Attaches a free-form message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Builds the error for a task that raised instead of returning.
    ///
    /// The message reads `"{kind}: {message}"`.
    pub fn raised(kind: &str, message: impl fmt::Display) -> Self {
        Self {
            expected: String::new(),
            actual: String::new(),
            message: Some(format!("{}: {}", kind, message)),
        }
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn actual(&self) -> &str {
        &self.actual
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.expected.is_empty() || !self.actual.is_empty() {
            parts.push(format!("expected '{}', got '{}'", self.expected, self.actual));
        }
        if let Some(message) = &self.message {
            parts.push(message.clone());
        }
        write!(f, "{}", parts.join(": "))
    }
}

/// The outcome of one task execution.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    method_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<TaskError>,
    success: bool,
    skipped: bool,
}

impl TaskResult {
    /// Creates a result; leading underscores are stripped from the name.
    pub fn new(method_name: &str, error: Option<TaskError>, skipped: bool) -> Self {
        let success = !(error.is_some() || skipped);
        Self {
            method_name: method_name.trim_start_matches('_').to_string(),
            error,
            success,
            skipped,
        }
    }

    /// A task that ran and passed.
    pub fn passed(method_name: &str) -> Self {
        Self::new(method_name, None, false)
    }

    /// A task that ran and failed.
    pub fn failed(method_name: &str, error: TaskError) -> Self {
        Self::new(method_name, Some(error), false)
    }

    /// A task that was never invoked.
    pub fn skipped(method_name: &str) -> Self {
        Self::new(method_name, None, true)
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn error(&self) -> Option<&TaskError> {
        self.error.as_ref()
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    pub fn status(&self) -> Status {
        if self.skipped {
            Status::Skipped
        } else if self.success {
            Status::Success
        } else {
            Status::Failure
        }
    }
}
