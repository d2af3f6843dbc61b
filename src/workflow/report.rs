//! Workflow Reports
//!
//! The immutable report tree returned by a workflow run. Each node is either
//! a single task outcome or a nested workflow; the aggregate status of a
//! workflow is computed once, when it is built.
//!
//! # Example Rendering
//!
//! ```text
//! Workflow: Serial ... FAILURE
//!     wf1 ... SUCCESS
//!     wf3 ... FAILURE
//!         Expected: baz
//!         Actual: bar
//!     wf2 ... SKIPPED
//! ```

use std::fmt;

use colored::Colorize;
use serde::Serialize;

use super::result::{Status, TaskResult};

const INDENT: &str = "    ";

/// One child of a workflow report.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportEntry {
    Task(TaskResult),
    Workflow(Workflow),
}

impl ReportEntry {
    pub fn success(&self) -> bool {
        match self {
            Self::Task(result) => result.success(),
            Self::Workflow(workflow) => workflow.success(),
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Task(result) => result.status(),
            Self::Workflow(workflow) => workflow.status(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Task(result) => result.method_name(),
            Self::Workflow(workflow) => workflow.name(),
        }
    }
}

impl From<TaskResult> for ReportEntry {
    fn from(result: TaskResult) -> Self {
        Self::Task(result)
    }
}

impl From<Workflow> for ReportEntry {
    fn from(workflow: Workflow) -> Self {
        Self::Workflow(workflow)
    }
}

/// Leaf outcome counts across a report tree.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ReportSummary {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tasks: {} passed, {} failed, {} skipped",
            self.total(),
            self.passed,
            self.failed,
            self.skipped
        )
    }
}

/// Report for a named sequence (or parallel group) of tasks.
///
/// Built once from its children and never mutated afterwards.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Workflow {
    workflow_name: String,
    parallel: bool,
    results: Vec<ReportEntry>,
    skipped: bool,
    success: bool,
    status: Status,
}

impl Workflow {
    /// Builds a serial workflow report.
    ///
    /// A workflow entered in the skipped state is never successful, even
    /// with no children.
    pub fn new(workflow_name: impl Into<String>, results: Vec<ReportEntry>, skipped: bool) -> Self {
        Self::build(workflow_name.into(), results, skipped, false)
    }

    /// Builds a parallel workflow report.
    pub fn parallel(
        workflow_name: impl Into<String>,
        results: Vec<ReportEntry>,
        skipped: bool,
    ) -> Self {
        Self::build(workflow_name.into(), results, skipped, true)
    }

    fn build(workflow_name: String, results: Vec<ReportEntry>, skipped: bool, parallel: bool) -> Self {
        let success = !skipped && results.iter().all(ReportEntry::success);
        let status = if skipped {
            Status::Skipped
        } else if success {
            Status::Success
        } else {
            Status::Failure
        };

        Self {
            workflow_name,
            parallel,
            results,
            skipped,
            success,
            status,
        }
    }

    pub fn name(&self) -> &str {
        &self.workflow_name
    }

    pub fn results(&self) -> &[ReportEntry] {
        &self.results
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// `Skipped` counts as non-success, like `Failure`: a workflow entered
    /// skipped always has `success() == false`.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Iterates over every task result in the tree, depth first.
    pub fn leaves(&self) -> Vec<&TaskResult> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a TaskResult>) {
        for entry in &self.results {
            match entry {
                ReportEntry::Task(result) => leaves.push(result),
                ReportEntry::Workflow(workflow) => workflow.collect_leaves(leaves),
            }
        }
    }

    /// Counts passed, failed and skipped task results.
    pub fn summary(&self) -> ReportSummary {
        self.leaves()
            .into_iter()
            .fold(ReportSummary::default(), |mut summary, result| {
                match result.status() {
                    Status::Success => summary.passed += 1,
                    Status::Failure => summary.failed += 1,
                    Status::Skipped => summary.skipped += 1,
                }
                summary
            })
    }

    /// Returns failed task results with their slash-joined path from the root.
    pub fn failures(&self) -> Vec<(String, &TaskResult)> {
        let mut failures = Vec::new();
        self.collect_failures(&self.workflow_name, &mut failures);
        failures
    }

    fn collect_failures<'a>(&'a self, prefix: &str, failures: &mut Vec<(String, &'a TaskResult)>) {
        for entry in &self.results {
            match entry {
                ReportEntry::Task(result) if result.status() == Status::Failure => {
                    failures.push((format!("{}/{}", prefix, result.method_name()), result));
                }
                ReportEntry::Task(_) => {}
                ReportEntry::Workflow(workflow) => {
                    let path = format!("{}/{}", prefix, workflow.name());
                    workflow.collect_failures(&path, failures);
                }
            }
        }
    }

    /// Renders the report as an indented tree.
    ///
    /// With `colorize` set, statuses are painted for terminal output.
    pub fn render(&self, colorize: bool) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0, colorize);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize, colorize: bool) {
        let label = if self.parallel {
            "ParallelWorkflow"
        } else {
            "Workflow"
        };
        out.push_str(&format!(
            "{}{}: {} ... {}\n",
            INDENT.repeat(depth),
            label,
            self.workflow_name,
            paint(self.status, colorize)
        ));

        for entry in &self.results {
            match entry {
                ReportEntry::Workflow(workflow) => workflow.render_into(out, depth + 1, colorize),
                ReportEntry::Task(result) => {
                    out.push_str(&format!(
                        "{}{} ... {}\n",
                        INDENT.repeat(depth + 1),
                        result.method_name(),
                        paint(result.status(), colorize)
                    ));

                    if let Some(error) = result.error() {
                        let pad = INDENT.repeat(depth + 2);
                        if !error.expected().is_empty() {
                            out.push_str(&format!("{}Expected: {}\n", pad, error.expected()));
                        }
                        if !error.actual().is_empty() {
                            out.push_str(&format!("{}Actual: {}\n", pad, error.actual()));
                        }
                        if let Some(message) = error.message() {
                            out.push_str(&format!("{}Message: {}\n", pad, message));
                        }
                    }
                }
            }
        }
    }
}

fn paint(status: Status, colorize: bool) -> String {
    let text = status.to_string();
    if !colorize {
        return text;
    }
    match status {
        Status::Success => text.green().to_string(),
        Status::Failure => text.red().bold().to_string(),
        Status::Skipped => text.yellow().to_string(),
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(false))
    }
}
