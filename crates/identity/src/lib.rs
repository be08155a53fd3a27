//! Identity domain module.
//!
//! Account records, registration input rules and the role-assignment policy,
//! implemented purely as deterministic domain logic (no IO, no hashing, no
//! storage).

pub mod account;
pub mod registration;

pub use account::{Account, DisplayName, EmailAddress};
pub use registration::{Registration, RegistrationPolicy};
