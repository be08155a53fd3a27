//! Service catalog domain module.
//!
//! Field rules for government service definitions and the partial-update
//! merge, implemented as pure functions over values (no IO, no storage).

pub mod service;

pub use service::{ServiceDefinition, ServiceDraft, ServicePatch};
