//! Workflow Runner
//!
//! Executes an ordered list of tasks against one piece of input data.
//!
//! - **Serial** runners thread each task's output into the next task. Once a
//!   task fails, every later task in the same sequence is reported as skipped
//!   without being invoked, nested runners included.
//! - **Parallel** runners hand every task the same input and never skip
//!   siblings on failure. Tasks are still executed one after another; the
//!   grouping only changes data flow and skip semantics.

use std::fmt;

use log::{debug, info};

use super::report::{ReportEntry, Workflow};
use super::result::TaskResult;
use super::task::{ParallelTasks, Step, Task};

/// Runs tasks and produces a [`Workflow`] report.
///
/// # Example
///
/// ```
/// use cloudcafe::workflow::{ParallelTasks, Task, TaskError, WorkflowRunner};
///
/// let mut runner = WorkflowRunner::new(
///     "trim and check",
///     vec![Task::step("trim", |s: String| Ok(s.trim().to_string()))],
/// );
/// runner.add_task(ParallelTasks::new(
///     vec![
///         Task::step("not_empty", |s: String| {
///             if s.is_empty() {
///                 Err(TaskError::new("non-empty", "").into())
///             } else {
///                 Ok(s)
///             }
///         }),
///         Task::step("short", |s: String| Ok(s)),
///     ],
///     "checks",
/// ));
///
/// let (report, output) = runner.run("  hello ".to_string());
/// assert!(report.success());
/// assert_eq!(output.as_deref(), Some("hello"));
/// ```
pub struct WorkflowRunner<T> {
    description: String,
    tasks: Vec<Task<T>>,
    parallel: bool,
    log_result: bool,
}

impl<T> WorkflowRunner<T> {
    /// Creates a serial runner.
    pub fn new(description: impl Into<String>, tasks: Vec<Task<T>>) -> Self {
        Self {
            description: description.into(),
            tasks,
            parallel: false,
            log_result: false,
        }
    }

    /// Creates a parallel runner.
    pub fn parallel(description: impl Into<String>, tasks: Vec<Task<T>>) -> Self {
        Self {
            parallel: true,
            ..Self::new(description, tasks)
        }
    }

    /// Appends a task.
    pub fn add_task(&mut self, task: impl Into<Task<T>>) {
        self.tasks.push(task.into());
    }

    /// Builder form of [`add_task`](Self::add_task).
    pub fn with_task(mut self, task: impl Into<Task<T>>) -> Self {
        self.add_task(task);
        self
    }

    /// Logs the input, result and output of every step. Nested runners
    /// inherit the setting.
    pub fn set_log_result(&mut self, log_result: bool) {
        self.log_result = log_result;
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn tasks(&self) -> &[Task<T>] {
        &self.tasks
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }
}

impl<T: Clone + fmt::Debug> WorkflowRunner<T> {
    /// Runs every task against `data`.
    ///
    /// Returns the report and, for serial runners, the output of the last
    /// task (`None` once anything failed).
    pub fn run(&self, data: T) -> (Workflow, Option<T>) {
        self.run_with_skip(data, false)
    }

    /// Runs with an explicit skip flag. With `skip` set nothing is invoked
    /// and the whole tree is reported as skipped.
    pub fn run_with_skip(&self, data: T, skip: bool) -> (Workflow, Option<T>) {
        debug!(
            "Running workflow '{}' ({} tasks, parallel: {})",
            self.description,
            self.tasks.len(),
            self.parallel
        );
        self.execute(Some(data), skip, false)
    }

    fn execute(&self, data: Option<T>, skip: bool, log_result: bool) -> (Workflow, Option<T>) {
        execute_tasks(
            &self.description,
            &self.tasks,
            self.parallel,
            data,
            skip,
            log_result || self.log_result,
        )
    }
}

fn execute_tasks<T: Clone + fmt::Debug>(
    description: &str,
    tasks: &[Task<T>],
    parallel: bool,
    data: Option<T>,
    skip: bool,
    log_result: bool,
) -> (Workflow, Option<T>) {
    let entered_skipped = skip;
    let mut skip = skip;
    let mut current = data;
    let mut results: Vec<ReportEntry> = Vec::with_capacity(tasks.len());

    if entered_skipped {
        debug!("Workflow '{}' entered in skipped state", description);
    }

    for task in tasks {
        let input = if parallel {
            current.clone()
        } else {
            current.take()
        };

        let (entry, output) = match task {
            Task::Step(step) => {
                let (result, output) = run_step(step, input, skip, log_result);
                (ReportEntry::Task(result), output)
            }
            Task::Parallel(group) => {
                let (workflow, output) = run_group(group, input, skip, log_result);
                (ReportEntry::Workflow(workflow), output)
            }
            Task::Sub(runner) => {
                let (workflow, output) = runner.execute(input, skip, log_result);
                (ReportEntry::Workflow(workflow), output)
            }
        };

        if !parallel {
            if entry.success() {
                current = output;
            } else {
                if !skip {
                    debug!(
                        "Task '{}' in '{}' failed; skipping remaining tasks",
                        entry.name(),
                        description
                    );
                }
                skip = true;
                current = None;
            }
        }

        results.push(entry);
    }

    let report = if parallel {
        Workflow::parallel(description, results, entered_skipped)
    } else {
        Workflow::new(description, results, entered_skipped)
    };

    // Parallel groups pass their input through only when every member passed.
    let output = if parallel && !report.success() {
        None
    } else {
        current
    };

    debug!("Workflow '{}' finished: {}", description, report.status());
    (report, output)
}

fn run_group<T: Clone + fmt::Debug>(
    group: &ParallelTasks<T>,
    data: Option<T>,
    skip: bool,
    log_result: bool,
) -> (Workflow, Option<T>) {
    execute_tasks(group.name(), group.tasks(), true, data, skip, log_result)
}

fn run_step<T: fmt::Debug>(
    step: &Step<T>,
    data: Option<T>,
    skip: bool,
    log_result: bool,
) -> (TaskResult, Option<T>) {
    let input = match data {
        Some(input) if !skip => input,
        _ => return (TaskResult::skipped(step.name()), None),
    };

    let logged_input = log_result.then(|| format!("{:?}", input));

    let (result, output) = match step.invoke(input) {
        Ok(output) => (TaskResult::passed(step.name()), Some(output)),
        Err(error) => {
            debug!("Task '{}' failed: {}", step.name(), error);
            (TaskResult::failed(step.name(), error), None)
        }
    };

    if let Some(input) = logged_input {
        info!(
            "Task '{}'\n  input: {}\n  result: {}\n  output: {:?}",
            result.method_name(),
            input,
            result.status(),
            output
        );
    }

    (result, output)
}

impl<T> fmt::Debug for WorkflowRunner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowRunner")
            .field("description", &self.description)
            .field("tasks", &self.tasks)
            .field("parallel", &self.parallel)
            .field("log_result", &self.log_result)
            .finish()
    }
}
