//! Application lifecycle domain module.
//!
//! This crate contains the status state machine for citizens' applications,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage). Who may trigger a transition is decided by the authorization
//! gate before any of this runs.

pub mod application;
pub mod policy;
pub mod status;

pub use application::Application;
pub use policy::{LifecyclePolicy, TransitionPolicy};
pub use status::ApplicationStatus;
