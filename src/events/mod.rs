//! Compute Event Validation Module
//!
//! Models for compute notifications and the validation workflows that
//! check a captured notification stream against an expected instance
//! lifecycle.
//!
//! # Structure
//!
//! - [`models`]: Notification envelope, instance payload and flavor models
//! - [`validators`]: Task builders and lifecycle workflows

pub mod models;
pub mod validators;

pub use models::{Flavor, InstancePayload, Notification};
pub use validators::{
    expect_chronological,
    expect_event_count,
    expect_flavor,
    expect_payload_field,
    expect_payload_present,
    expect_payload_schema,
    for_instance,
    lifecycle_workflow,
    InstanceAction,
    Notifications,
};
