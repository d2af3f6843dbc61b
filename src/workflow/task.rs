//! Workflow Tasks
//!
//! A task is one of three shapes: a named step function, a parallel group
//! of tasks, or a nested runner. Step functions either pass their (possibly
//! transformed) input on, report a [`TaskError`], or raise an error of their
//! own; raised errors and panics are turned into `TaskError`s in
//! [`Step::invoke`] and nowhere else.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use super::result::TaskError;
use super::runner::WorkflowRunner;

/// Boxed step function.
pub type StepFn<T> = Box<dyn Fn(T) -> Result<T, TaskFailure>>;

/// Why a step did not hand its output on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    /// The step checked something and it did not hold
    Failed(TaskError),
    /// The step raised an error of its own
    Raised { kind: String, message: String },
}

impl TaskFailure {
    /// Records a raised error, naming it after its type.
    pub fn raised<E: std::error::Error>(error: E) -> Self {
        Self::Raised {
            kind: short_type_name(std::any::type_name::<E>()),
            message: error.to_string(),
        }
    }

    /// Converts the failure into the error recorded in the report.
    pub fn into_error(self) -> TaskError {
        match self {
            Self::Failed(error) => error,
            Self::Raised { kind, message } => TaskError::raised(&kind, message),
        }
    }
}

impl From<TaskError> for TaskFailure {
    fn from(error: TaskError) -> Self {
        Self::Failed(error)
    }
}

// Lets step functions use `?` on any standard error.
impl<E: std::error::Error> From<E> for TaskFailure {
    fn from(error: E) -> Self {
        Self::raised(error)
    }
}

/// Strips module paths and generic arguments from a type name.
///
/// A bare `Error` keeps its nearest module other than `error`, so
/// `std::io::error::Error` reads `io::Error`.
fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    let mut segments = base.rsplit("::");
    let last = segments.next().unwrap_or(base);

    if last != "Error" {
        return last.to_string();
    }

    match segments.find(|segment| *segment != "error") {
        Some(module) => format!("{}::{}", module, last),
        None => last.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// A named unary step.
pub struct Step<T> {
    name: String,
    func: StepFn<T>,
}

impl<T> Step<T> {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(T) -> Result<T, TaskFailure> + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the step, normalizing raised errors and panics into a `TaskError`.
    pub fn invoke(&self, input: T) -> Result<T, TaskError> {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.func)(input))) {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(failure)) => Err(failure.into_error()),
            Err(payload) => Err(TaskError::raised("panic", panic_message(payload.as_ref()))),
        }
    }
}

impl<T> fmt::Debug for Step<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish()
    }
}

/// A group of tasks that all receive the same input.
///
/// Runs as a nested parallel workflow named after the group.
pub struct ParallelTasks<T> {
    tasks: Vec<Task<T>>,
    name: String,
}

impl<T> ParallelTasks<T> {
    pub fn new(tasks: Vec<Task<T>>, name: impl Into<String>) -> Self {
        Self {
            tasks,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &[Task<T>] {
        &self.tasks
    }
}

/// Anything a [`WorkflowRunner`] can execute.
pub enum Task<T> {
    Step(Step<T>),
    Parallel(ParallelTasks<T>),
    Sub(WorkflowRunner<T>),
}

impl<T> Task<T> {
    /// Shorthand for a step task.
    ///
    /// # Example
    ///
    /// ```
    /// use cloudcafe::workflow::{Task, TaskError};
    ///
    /// let double: Task<i64> = Task::step("double", |n| Ok(n * 2));
    /// let positive: Task<i64> = Task::step("positive", |n: i64| {
    ///     if n > 0 {
    ///         Ok(n)
    ///     } else {
    ///         Err(TaskError::new("> 0", n.to_string()).into())
    ///     }
    /// });
    /// # let _ = (double, positive);
    /// ```
    pub fn step<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(T) -> Result<T, TaskFailure> + 'static,
    {
        Self::Step(Step::new(name, func))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Step(step) => step.name(),
            Self::Parallel(group) => group.name(),
            Self::Sub(runner) => runner.description(),
        }
    }
}

impl<T> fmt::Debug for ParallelTasks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelTasks")
            .field("name", &self.name)
            .field("tasks", &self.tasks)
            .finish()
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step(step) => step.fmt(f),
            Self::Parallel(group) => group.fmt(f),
            Self::Sub(runner) => runner.fmt(f),
        }
    }
}

impl<T> From<Step<T>> for Task<T> {
    fn from(step: Step<T>) -> Self {
        Self::Step(step)
    }
}

impl<T> From<ParallelTasks<T>> for Task<T> {
    fn from(group: ParallelTasks<T>) -> Self {
        Self::Parallel(group)
    }
}

impl<T> From<WorkflowRunner<T>> for Task<T> {
    fn from(runner: WorkflowRunner<T>) -> Self {
        Self::Sub(runner)
    }
}
