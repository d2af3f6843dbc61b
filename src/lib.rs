//! CloudCAFE - Test Automation Support for OpenStack-family Services
//!
//! Building blocks for API test suites: validation workflows that report
//! every check as data, and models that round-trip request/response bodies
//! through JSON and XML.
//!
//! # Architecture
//!
//! The library is organized into four main modules:
//!
//! - [`workflow`]: Serial/parallel validation runner and its report tree
//! - [`marshalling`]: JSON/XML auto-marshalling contract for models
//! - [`events`]: Compute notification models and lifecycle validators
//! - [`config`]: YAML configuration shared by the library and CLI
//!
//! # Example
//!
//! ```rust
//! use cloudcafe::workflow::{Task, TaskError, WorkflowRunner};
//!
//! let runner = WorkflowRunner::new(
//!     "server build",
//!     vec![
//!         Task::step("parse_status", |body: String| Ok(body.trim().to_uppercase())),
//!         Task::step("is_active", |status: String| {
//!             if status == "ACTIVE" {
//!                 Ok(status)
//!             } else {
//!                 Err(TaskError::new("ACTIVE", status).into())
//!             }
//!         }),
//!     ],
//! );
//!
//! let (report, status) = runner.run(" active ".to_string());
//! assert!(report.success());
//! assert_eq!(status.as_deref(), Some("ACTIVE"));
//! println!("{}", report);
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod marshalling;
pub mod workflow;

// Re-export commonly used types
pub use config::CafeConfig;
pub use error::{CafeError, Result};
pub use marshalling::{AutoMarshallingModel, DeserializePolicy, Format};
pub use workflow::{ParallelTasks, Task, TaskError, TaskResult, Workflow, WorkflowRunner};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "CloudCAFE";
