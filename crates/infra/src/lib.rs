//! Infrastructure layer: stores (in-memory, Postgres) and the portal
//! orchestration that composes them with the domain crates.

pub mod portal;
pub mod store;


pub use portal::{
    ApplicationView, LoginOutcome, Portal, PortalError, PortalResult, PortalSettings,
    LOGIN_FAILURE_MESSAGE,
};
pub use store::{PostgresStores, StoreError, Stores};
