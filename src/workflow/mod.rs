//! Validation Workflow Module
//!
//! Runs ordered validation tasks against a piece of data and reports the
//! outcome of each one as an immutable tree.
//!
//! # Structure
//!
//! - [`result`]: Task outcomes ([`TaskResult`], [`TaskError`], [`Status`])
//! - [`report`]: Aggregated [`Workflow`] reports
//! - [`task`]: Task shapes accepted by the runner
//! - [`runner`]: The [`WorkflowRunner`] itself

pub mod report;
pub mod result;
pub mod runner;
pub mod task;

pub use report::{ReportEntry, ReportSummary, Workflow};
pub use result::{Status, TaskError, TaskResult};
pub use runner::WorkflowRunner;
pub use task::{ParallelTasks, Step, Task, TaskFailure};
