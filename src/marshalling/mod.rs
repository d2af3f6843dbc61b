//! Auto-marshalling Module
//!
//! Converts attribute models to and from JSON and XML request/response
//! bodies.
//!
//! # Structure
//!
//! - [`format`]: Wire formats and deserialization policies
//! - [`model`]: The [`AutoMarshallingModel`] contract
//! - [`xml`]: quick-xml helpers used by the XML side of the contract

pub mod format;
pub mod model;
pub mod xml;

pub use format::{DeserializePolicy, Format};
pub use model::{prune_empty, AutoMarshallingModel};
