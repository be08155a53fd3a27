//! Persistence ports for the three portal stores.
//!
//! Each store exclusively owns its records. Applications hold only ids of
//! their applicant and service; references are resolved at read time by the
//! portal, so a deleted service simply stops resolving.
//!
//! ## Atomicity
//!
//! A single-record write is the unit of atomicity. Account uniqueness (email,
//! display name) and the optional application version check are enforced
//! inside the store so concurrent requests cannot both succeed.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use civicdesk_applications::Application;
use civicdesk_catalog::ServiceDefinition;
use civicdesk_core::{AccountId, ApplicationId, DomainError, ExpectedVersion, ServiceId};
use civicdesk_identity::{Account, DisplayName, EmailAddress};

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryAccountStore, InMemoryApplicationStore, InMemoryCatalogStore};
pub use postgres::PostgresStores;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Unique constraint or version check failed.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backend failed (connection, query, corrupt row).
    #[error("storage error: {0}")]
    Backend(String),
}

impl From<DomainError> for StoreError {
    /// Stored rows are re-validated on load; a failure means corrupt data.
    fn from(value: DomainError) -> Self {
        StoreError::Backend(format!("stored record failed validation: {value}"))
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account; `Conflict` when the email or display name is taken.
    async fn insert(&self, account: Account) -> Result<(), StoreError>;

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<Account>, StoreError>;

    async fn find_by_display_name(&self, name: &DisplayName) -> Result<Option<Account>, StoreError>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert(&self, service: ServiceDefinition) -> Result<(), StoreError>;

    async fn get(&self, id: ServiceId) -> Result<Option<ServiceDefinition>, StoreError>;

    /// All services in creation order.
    async fn list(&self) -> Result<Vec<ServiceDefinition>, StoreError>;

    /// Replace an existing definition; `NotFound` if it was deleted meanwhile.
    async fn update(&self, service: ServiceDefinition) -> Result<(), StoreError>;

    /// Remove a definition. Returns `false` when nothing was stored under `id`.
    async fn delete(&self, id: ServiceId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn insert(&self, application: Application) -> Result<(), StoreError>;

    async fn get(&self, id: ApplicationId) -> Result<Option<Application>, StoreError>;

    /// Applications submitted by `applicant`, in creation order.
    async fn list_by_applicant(&self, applicant: AccountId) -> Result<Vec<Application>, StoreError>;

    /// Every application, in creation order.
    async fn list_all(&self) -> Result<Vec<Application>, StoreError>;

    async fn exists_for(&self, applicant: AccountId, service: ServiceId) -> Result<bool, StoreError>;

    /// Replace the stored record.
    ///
    /// `expected` is compared with the *stored* version in the same atomic
    /// step as the write; a mismatch is `Conflict`. `ExpectedVersion::Any`
    /// is last-write-wins.
    async fn update(&self, application: Application, expected: ExpectedVersion) -> Result<(), StoreError>;
}

/// The three stores, shared behind trait objects.
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub applications: Arc<dyn ApplicationStore>,
}

impl Stores {
    /// In-memory stores for tests/dev.
    pub fn in_memory() -> Self {
        Self {
            accounts: Arc::new(InMemoryAccountStore::new()),
            catalog: Arc::new(InMemoryCatalogStore::new()),
            applications: Arc::new(InMemoryApplicationStore::new()),
        }
    }

    /// Postgres-backed stores sharing one pool.
    pub fn postgres(stores: PostgresStores) -> Self {
        let stores = Arc::new(stores);
        Self {
            accounts: stores.clone(),
            catalog: stores.clone(),
            applications: stores,
        }
    }
}
