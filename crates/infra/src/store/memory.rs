//! In-memory stores.
//!
//! Intended for tests/dev. Each store guards one map with a `RwLock`; every
//! check-then-write happens under a single write guard.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use civicdesk_applications::Application;
use civicdesk_catalog::ServiceDefinition;
use civicdesk_core::{AccountId, ApplicationId, ExpectedVersion, ServiceId};
use civicdesk_identity::{Account, DisplayName, EmailAddress};

use super::{AccountStore, ApplicationStore, CatalogStore, StoreError};

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StoreError> {
    lock.read()
        .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StoreError> {
    lock.write()
        .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
}

#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<BTreeMap<AccountId, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn insert(&self, account: Account) -> Result<(), StoreError> {
        let mut accounts = write(&self.accounts)?;

        if accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::Conflict("email already registered".to_string()));
        }
        if accounts.values().any(|a| a.display_name == account.display_name) {
            return Err(StoreError::Conflict("display name already taken".to_string()));
        }
        if accounts.contains_key(&account.id) {
            return Err(StoreError::Conflict(format!("account {} already exists", account.id)));
        }

        accounts.insert(account.id, account);
        Ok(())
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(read(&self.accounts)?.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<Account>, StoreError> {
        Ok(read(&self.accounts)?
            .values()
            .find(|a| &a.email == email)
            .cloned())
    }

    async fn find_by_display_name(&self, name: &DisplayName) -> Result<Option<Account>, StoreError> {
        Ok(read(&self.accounts)?
            .values()
            .find(|a| &a.display_name == name)
            .cloned())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    services: RwLock<BTreeMap<ServiceId, ServiceDefinition>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn insert(&self, service: ServiceDefinition) -> Result<(), StoreError> {
        let mut services = write(&self.services)?;
        if services.contains_key(&service.id) {
            return Err(StoreError::Conflict(format!("service {} already exists", service.id)));
        }
        services.insert(service.id, service);
        Ok(())
    }

    async fn get(&self, id: ServiceId) -> Result<Option<ServiceDefinition>, StoreError> {
        Ok(read(&self.services)?.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<ServiceDefinition>, StoreError> {
        let mut all: Vec<_> = read(&self.services)?.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn update(&self, service: ServiceDefinition) -> Result<(), StoreError> {
        let mut services = write(&self.services)?;
        match services.get_mut(&service.id) {
            Some(slot) => {
                *slot = service;
                Ok(())
            }
            None => Err(StoreError::NotFound("service")),
        }
    }

    async fn delete(&self, id: ServiceId) -> Result<bool, StoreError> {
        Ok(write(&self.services)?.remove(&id).is_some())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryApplicationStore {
    applications: RwLock<BTreeMap<ApplicationId, Application>>,
}

impl InMemoryApplicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(mut apps: Vec<Application>) -> Vec<Application> {
        apps.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        apps
    }
}

#[async_trait]
impl ApplicationStore for InMemoryApplicationStore {
    async fn insert(&self, application: Application) -> Result<(), StoreError> {
        let mut apps = write(&self.applications)?;
        if apps.contains_key(&application.id) {
            return Err(StoreError::Conflict(format!(
                "application {} already exists",
                application.id
            )));
        }
        apps.insert(application.id, application);
        Ok(())
    }

    async fn get(&self, id: ApplicationId) -> Result<Option<Application>, StoreError> {
        Ok(read(&self.applications)?.get(&id).cloned())
    }

    async fn list_by_applicant(&self, applicant: AccountId) -> Result<Vec<Application>, StoreError> {
        let apps = read(&self.applications)?
            .values()
            .filter(|a| a.applicant == applicant)
            .cloned()
            .collect();
        Ok(Self::sorted(apps))
    }

    async fn list_all(&self) -> Result<Vec<Application>, StoreError> {
        let apps = read(&self.applications)?.values().cloned().collect();
        Ok(Self::sorted(apps))
    }

    async fn exists_for(&self, applicant: AccountId, service: ServiceId) -> Result<bool, StoreError> {
        Ok(read(&self.applications)?
            .values()
            .any(|a| a.applicant == applicant && a.service == service))
    }

    async fn update(&self, application: Application, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut apps = write(&self.applications)?;
        let slot = apps
            .get_mut(&application.id)
            .ok_or(StoreError::NotFound("application"))?;

        if !expected.matches(slot.version) {
            return Err(StoreError::Conflict(format!(
                "expected version {expected:?}, found {}",
                slot.version
            )));
        }

        *slot = application;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use civicdesk_auth::Role;

    fn account(name: &str, email: &str) -> Account {
        Account {
            id: AccountId::new(),
            display_name: DisplayName::parse(name).unwrap(),
            email: EmailAddress::parse(email).unwrap(),
            credential_hash: "hash".to_string(),
            role: Role::Citizen,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn account_email_uniqueness_ignores_case() {
        let store = InMemoryAccountStore::new();
        store.insert(account("alice", "alice@x.com")).await.unwrap();

        let err = store.insert(account("alice2", "ALICE@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn account_display_name_must_be_unique() {
        let store = InMemoryAccountStore::new();
        store.insert(account("alice", "a@x.com")).await.unwrap();

        let err = store.insert(account("alice", "b@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn stale_application_update_is_rejected() {
        let store = InMemoryApplicationStore::new();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let app = Application::submit(ApplicationId::new(), AccountId::new(), ServiceId::new(), now);
        store.insert(app.clone()).await.unwrap();

        let mut next = app.clone();
        next.version = 2;
        store.update(next.clone(), ExpectedVersion::Exact(1)).await.unwrap();

        let err = store.update(next, ExpectedVersion::Exact(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_of_missing_application_is_not_found() {
        let store = InMemoryApplicationStore::new();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let app = Application::submit(ApplicationId::new(), AccountId::new(), ServiceId::new(), now);

        let err = store.update(app, ExpectedVersion::Any).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound("application"));
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let store = InMemoryCatalogStore::new();
        assert!(!store.delete(ServiceId::new()).await.unwrap());
    }
}
