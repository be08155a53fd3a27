//! Portal orchestration (application-level use cases).
//!
//! Every operation follows the same pipeline:
//!
//! ```text
//! caller
//!   ↓
//! 1. Authorization gate (role × operation)
//!   ↓
//! 2. Load current records from the stores
//!   ↓
//! 3. Pure domain decision (identity / catalog / applications crates)
//!   ↓
//! 4. Single-record write (the store enforces uniqueness and versions)
//! ```
//!
//! The portal composes the store traits, the credential hasher, the token
//! issuer and a clock. It contains no IO of its own beyond those seams, so
//! the whole pipeline runs against in-memory stores in tests.

use std::sync::Arc;

use chrono::Duration;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use civicdesk_applications::{Application, ApplicationStatus, LifecyclePolicy};
use civicdesk_auth::{
    allowed_roles, authorize, AssertionClaims, AuthzError, CredentialError, CredentialHasher, JwtIssuer,
    Operation, Principal, Role, TokenIssueError,
};
use civicdesk_catalog::{ServiceDefinition, ServiceDraft, ServicePatch};
use civicdesk_core::{
    AccountId, ApplicationId, Clock, DomainError, ExpectedVersion, ServiceId,
};
use civicdesk_identity::{Account, DisplayName, EmailAddress, Registration, RegistrationPolicy};

use crate::store::{StoreError, Stores};

/// Message for every failed login, whatever the cause.
pub const LOGIN_FAILURE_MESSAGE: &str = "invalid email or credential";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PortalError {
    #[error("{0}")]
    Validation(String),

    /// The caller is not (or could not be) identified.
    #[error("{0}")]
    Authentication(String),

    /// The caller is identified but its role may not do this.
    #[error("{0}")]
    Authorization(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(StoreError),

    /// Hashing, signing or a blocking task failed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for PortalError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => PortalError::Validation(msg),
            DomainError::InvalidId(msg) => PortalError::Validation(msg),
            DomainError::NotFound(what) => PortalError::NotFound(what),
            DomainError::Conflict(msg) => PortalError::Conflict(msg),
            DomainError::Unauthorized(msg) => PortalError::Authorization(msg),
        }
    }
}

impl From<StoreError> for PortalError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(what) => PortalError::NotFound(what),
            StoreError::Conflict(msg) => PortalError::Conflict(msg),
            StoreError::Backend(_) => PortalError::Store(value),
        }
    }
}

impl From<AuthzError> for PortalError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Unauthenticated(_) => PortalError::Authentication(value.to_string()),
            AuthzError::Forbidden { .. } => PortalError::Authorization(value.to_string()),
        }
    }
}

impl From<CredentialError> for PortalError {
    fn from(value: CredentialError) -> Self {
        PortalError::Internal(value.to_string())
    }
}

impl From<TokenIssueError> for PortalError {
    fn from(value: TokenIssueError) -> Self {
        PortalError::Internal(value.to_string())
    }
}

pub type PortalResult<T> = Result<T, PortalError>;

/// Tunable portal behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortalSettings {
    pub registration: RegistrationPolicy,
    pub lifecycle: LifecyclePolicy,
    pub token_ttl: Duration,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            registration: RegistrationPolicy::default(),
            lifecycle: LifecyclePolicy::default(),
            token_ttl: Duration::days(1),
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub account: Account,
}

/// An application with its references resolved.
///
/// `applicant` / `service` are `None` when the referenced record no longer
/// exists (services may be deleted while applications remain).
#[derive(Debug, Clone)]
pub struct ApplicationView {
    pub application: Application,
    pub applicant: Option<Account>,
    pub service: Option<ServiceDefinition>,
}

#[derive(Clone)]
pub struct Portal {
    stores: Stores,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<dyn JwtIssuer>,
    clock: Arc<dyn Clock>,
    settings: PortalSettings,
}

impl Portal {
    pub fn new(
        stores: Stores,
        hasher: Arc<dyn CredentialHasher>,
        tokens: Arc<dyn JwtIssuer>,
        clock: Arc<dyn Clock>,
        settings: PortalSettings,
    ) -> Self {
        Self {
            stores,
            hasher,
            tokens,
            clock,
            settings,
        }
    }

    fn gate(principal: &Principal, operation: Operation) -> PortalResult<()> {
        authorize(Some(principal.role), operation).map_err(|e| {
            warn!(
                account_id = %principal.account_id,
                role = %principal.role,
                operation = %operation,
                allowed = ?allowed_roles(operation),
                "operation denied"
            );
            PortalError::from(e)
        })
    }

    fn log_store_failure(err: &PortalError) {
        if let PortalError::Store(inner) = err {
            error!(error = %inner, "store operation failed");
        }
    }

    async fn hash_credential(&self, credential: String) -> PortalResult<String> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&credential))
            .await
            .map_err(|e| PortalError::Internal(format!("hashing task failed: {e}")))?
            .map_err(PortalError::from)
    }

    async fn verify_credential(&self, credential: String, stored_hash: String) -> PortalResult<bool> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&credential, &stored_hash))
            .await
            .map_err(|e| PortalError::Internal(format!("verification task failed: {e}")))?
            .map_err(PortalError::from)
    }

    async fn ensure_unclaimed(&self, display_name: &DisplayName, email: &EmailAddress) -> PortalResult<()> {
        if self.stores.accounts.find_by_email(email).await?.is_some() {
            return Err(PortalError::Conflict("email already registered".to_string()));
        }
        if self
            .stores
            .accounts
            .find_by_display_name(display_name)
            .await?
            .is_some()
        {
            return Err(PortalError::Conflict("display name already taken".to_string()));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Identity
    // -------------------------------------------------------------------------

    /// Create an account.
    ///
    /// `registrar` is the authenticated caller, if the request carried a
    /// valid assertion; it matters only for elevated role requests under the
    /// privileged registration policy.
    #[instrument(skip(self, registration, registrar), fields(email = %registration.email.as_str()))]
    pub async fn register(
        &self,
        registration: Registration,
        registrar: Option<&Principal>,
    ) -> PortalResult<Account> {
        let role = self
            .settings
            .registration
            .resolve_role(registration.requested_role, registrar.map(|p| p.role))?;

        self.ensure_unclaimed(&registration.display_name, &registration.email)
            .await?;

        let credential_hash = self.hash_credential(registration.credential).await?;
        let account = Account {
            id: AccountId::new(),
            display_name: registration.display_name,
            email: registration.email,
            credential_hash,
            role,
            created_at: self.clock.now(),
        };

        self.stores
            .accounts
            .insert(account.clone())
            .await
            .map_err(PortalError::from)
            .inspect_err(Self::log_store_failure)?;

        info!(account_id = %account.id, role = %account.role, "account registered");
        Ok(account)
    }

    /// Provision an officer account out-of-band (startup configuration).
    ///
    /// Idempotent by email: an existing account is returned unchanged.
    #[instrument(skip(self, credential))]
    pub async fn bootstrap_officer(
        &self,
        display_name: &str,
        email: &str,
        credential: &str,
    ) -> PortalResult<Account> {
        let registration = Registration::parse(display_name, email, credential, Some(Role::Officer))?;

        if let Some(existing) = self.stores.accounts.find_by_email(&registration.email).await? {
            if existing.role != Role::Officer {
                warn!(
                    account_id = %existing.id,
                    role = %existing.role,
                    "bootstrap email belongs to a non-officer account"
                );
            }
            return Ok(existing);
        }

        self.ensure_unclaimed(&registration.display_name, &registration.email)
            .await?;

        let credential_hash = self.hash_credential(registration.credential).await?;
        let account = Account {
            id: AccountId::new(),
            display_name: registration.display_name,
            email: registration.email,
            credential_hash,
            role: Role::Officer,
            created_at: self.clock.now(),
        };
        self.stores.accounts.insert(account.clone()).await?;

        info!(account_id = %account.id, "bootstrap officer provisioned");
        Ok(account)
    }

    /// Verify a credential and issue a signed assertion.
    ///
    /// Unknown email and wrong credential fail identically.
    #[instrument(skip(self, email, credential))]
    pub async fn login(&self, email: &str, credential: &str) -> PortalResult<LoginOutcome> {
        if email.trim().is_empty() || credential.is_empty() {
            return Err(PortalError::Validation(
                "email and credential are required".to_string(),
            ));
        }

        let failure = || PortalError::Authentication(LOGIN_FAILURE_MESSAGE.to_string());

        let Ok(email) = EmailAddress::parse(email) else {
            warn!("login rejected: malformed email");
            return Err(failure());
        };

        let Some(account) = self.stores.accounts.find_by_email(&email).await? else {
            warn!("login rejected: unknown email");
            return Err(failure());
        };

        let verified = self
            .verify_credential(credential.to_string(), account.credential_hash.clone())
            .await?;
        if !verified {
            warn!(account_id = %account.id, "login rejected: credential mismatch");
            return Err(failure());
        }

        let claims = AssertionClaims::new(
            account.id,
            account.role,
            account.email.as_str(),
            account.display_name.as_str(),
            self.clock.now(),
            self.settings.token_ttl,
        )?;
        let token = self.tokens.issue(&claims)?;

        info!(account_id = %account.id, role = %account.role, "login succeeded");
        Ok(LoginOutcome { token, account })
    }

    /// The caller's own account.
    pub async fn profile(&self, principal: &Principal) -> PortalResult<Account> {
        Self::gate(principal, Operation::ViewOwnProfile)?;
        self.stores
            .accounts
            .get(principal.account_id)
            .await?
            .ok_or(PortalError::NotFound("account"))
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    pub async fn list_services(&self) -> PortalResult<Vec<ServiceDefinition>> {
        self.stores
            .catalog
            .list()
            .await
            .map_err(PortalError::from)
            .inspect_err(Self::log_store_failure)
    }

    pub async fn get_service(&self, id: ServiceId) -> PortalResult<ServiceDefinition> {
        self.stores
            .catalog
            .get(id)
            .await?
            .ok_or(PortalError::NotFound("service"))
    }

    #[instrument(skip(self, principal, draft), fields(officer = %principal.account_id))]
    pub async fn create_service(
        &self,
        principal: &Principal,
        draft: ServiceDraft,
    ) -> PortalResult<ServiceDefinition> {
        Self::gate(principal, Operation::CreateService)?;

        let service = ServiceDefinition::create(
            ServiceId::new(),
            draft,
            principal.account_id,
            self.clock.now(),
        )?;
        self.stores.catalog.insert(service.clone()).await?;

        info!(service_id = %service.id, title = %service.title, "service created");
        Ok(service)
    }

    #[instrument(skip(self, principal, patch), fields(officer = %principal.account_id))]
    pub async fn update_service(
        &self,
        principal: &Principal,
        id: ServiceId,
        patch: ServicePatch,
    ) -> PortalResult<ServiceDefinition> {
        Self::gate(principal, Operation::UpdateService)?;

        let current = self.get_service(id).await?;
        let empty_patch = patch.is_empty();
        let updated = current.merge(patch, self.clock.now())?;
        self.stores.catalog.update(updated.clone()).await?;

        info!(service_id = %id, empty_patch, "service updated");
        Ok(updated)
    }

    /// Remove a service. Applications referencing it are left in place.
    #[instrument(skip(self, principal), fields(officer = %principal.account_id))]
    pub async fn delete_service(&self, principal: &Principal, id: ServiceId) -> PortalResult<()> {
        Self::gate(principal, Operation::DeleteService)?;

        if !self.stores.catalog.delete(id).await? {
            return Err(PortalError::NotFound("service"));
        }

        info!(service_id = %id, "service deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Applications
    // -------------------------------------------------------------------------

    /// Submit an application for the calling citizen.
    #[instrument(skip(self, principal), fields(applicant = %principal.account_id))]
    pub async fn submit_application(
        &self,
        principal: &Principal,
        service: ServiceId,
    ) -> PortalResult<Application> {
        Self::gate(principal, Operation::SubmitApplication)?;

        if self.stores.catalog.get(service).await?.is_none() {
            return Err(PortalError::NotFound("service"));
        }

        let lifecycle = self.settings.lifecycle;
        if !lifecycle.allow_duplicate_applications {
            let already = self
                .stores
                .applications
                .exists_for(principal.account_id, service)
                .await?;
            lifecycle.check_submission(already)?;
        }

        let application = Application::submit(
            ApplicationId::new(),
            principal.account_id,
            service,
            self.clock.now(),
        );
        self.stores.applications.insert(application.clone()).await?;

        info!(application_id = %application.id, service_id = %service, "application submitted");
        Ok(application)
    }

    /// Applications submitted by the caller, with references resolved.
    pub async fn my_applications(&self, principal: &Principal) -> PortalResult<Vec<ApplicationView>> {
        Self::gate(principal, Operation::ListOwnApplications)?;

        let applications = self
            .stores
            .applications
            .list_by_applicant(principal.account_id)
            .await?;
        self.resolve(applications).await
    }

    /// Every application, with references resolved.
    pub async fn all_applications(&self, principal: &Principal) -> PortalResult<Vec<ApplicationView>> {
        Self::gate(principal, Operation::ListAllApplications)?;

        let applications = self
            .stores
            .applications
            .list_all()
            .await
            .map_err(PortalError::from)
            .inspect_err(Self::log_store_failure)?;
        self.resolve(applications).await
    }

    /// Overwrite the status of an application.
    ///
    /// With `ExpectedVersion::Exact` a stale write is rejected as a conflict;
    /// with `ExpectedVersion::Any` the last write wins.
    #[instrument(skip(self, principal), fields(reviewer = %principal.account_id))]
    pub async fn set_status(
        &self,
        principal: &Principal,
        id: ApplicationId,
        status: ApplicationStatus,
        expected: ExpectedVersion,
    ) -> PortalResult<Application> {
        Self::gate(principal, Operation::ChangeApplicationStatus)?;

        let current = self
            .stores
            .applications
            .get(id)
            .await?
            .ok_or(PortalError::NotFound("application"))?;
        expected.check(current.version)?;

        let updated = current.set_status(status, self.clock.now(), &self.settings.lifecycle)?;
        self.stores
            .applications
            .update(updated.clone(), expected)
            .await?;

        info!(
            application_id = %id,
            from = %current.status,
            to = %updated.status,
            version = updated.version,
            "application status changed"
        );
        Ok(updated)
    }

    async fn resolve(&self, applications: Vec<Application>) -> PortalResult<Vec<ApplicationView>> {
        let mut views = Vec::with_capacity(applications.len());
        for application in applications {
            let applicant = self.stores.accounts.get(application.applicant).await?;
            let service = self.stores.catalog.get(application.service).await?;
            views.push(ApplicationView {
                application,
                applicant,
                service,
            });
        }
        Ok(views)
    }
}
