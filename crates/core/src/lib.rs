//! `civicdesk-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the identity,
//! catalog and application crates (no infrastructure concerns).

pub mod clock;
pub mod concurrency;
pub mod error;
pub mod id;

pub use clock::{Clock, SystemClock};
pub use concurrency::ExpectedVersion;
pub use error::{DomainError, DomainResult};
pub use id::{AccountId, ApplicationId, ServiceId};
