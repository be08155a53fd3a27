//! Postgres-backed stores.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Code | StoreError |
//! |------------|-----------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any | `Backend` |
//! | PoolClosed / network / decode | N/A | `Backend` |
//!
//! Uniqueness of account email and display name is enforced by named
//! constraints, so concurrent registrations cannot both succeed. The
//! application version check is folded into the `UPDATE` predicate.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{info, instrument};

use civicdesk_applications::{Application, ApplicationStatus};
use civicdesk_auth::Role;
use civicdesk_catalog::ServiceDefinition;
use civicdesk_core::{AccountId, ApplicationId, ExpectedVersion, ServiceId};
use civicdesk_identity::{Account, DisplayName, EmailAddress};

use super::{AccountStore, ApplicationStore, CatalogStore, StoreError};

const SCHEMA: &str = include_str!("schema.sql");

const ACCOUNT_COLUMNS: &str = "id, display_name, email, credential_hash, role, created_at";
const SERVICE_COLUMNS: &str =
    "id, title, description, required_documents, fee, created_by, created_at, updated_at";
const APPLICATION_COLUMNS: &str =
    "id, applicant_id, service_id, status, created_at, updated_at, version";

/// All three stores over one connection pool.
#[derive(Debug, Clone)]
pub struct PostgresStores {
    pool: PgPool,
}

impl PostgresStores {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and apply the schema.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        let stores = Self::new(pool);
        stores.migrate().await?;
        Ok(stores)
    }

    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        info!("database schema is up to date");
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(conflict_message(db_err.constraint())),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

fn conflict_message(constraint: Option<&str>) -> String {
    match constraint {
        Some("accounts_email_key") => "email already registered".to_string(),
        Some("accounts_display_name_key") => "display name already taken".to_string(),
        Some(other) => format!("unique constraint {other} violated"),
        None => "unique constraint violated".to_string(),
    }
}

fn decode_error(operation: &str, err: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("failed to decode row in {operation}: {err}"))
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    let get = |e| decode_error("account", e);
    let role: String = row.try_get("role").map_err(get)?;
    let display_name: String = row.try_get("display_name").map_err(get)?;
    let email: String = row.try_get("email").map_err(get)?;

    Ok(Account {
        id: AccountId::from_uuid(row.try_get("id").map_err(get)?),
        display_name: DisplayName::parse(&display_name)?,
        email: EmailAddress::parse(&email)?,
        credential_hash: row.try_get("credential_hash").map_err(get)?,
        role: Role::from_str(&role)?,
        created_at: row.try_get("created_at").map_err(get)?,
    })
}

fn service_from_row(row: &PgRow) -> Result<ServiceDefinition, StoreError> {
    let get = |e| decode_error("service", e);
    Ok(ServiceDefinition {
        id: ServiceId::from_uuid(row.try_get("id").map_err(get)?),
        title: row.try_get("title").map_err(get)?,
        description: row.try_get("description").map_err(get)?,
        required_documents: row.try_get("required_documents").map_err(get)?,
        fee: row.try_get("fee").map_err(get)?,
        created_by: AccountId::from_uuid(row.try_get("created_by").map_err(get)?),
        created_at: row.try_get("created_at").map_err(get)?,
        updated_at: row.try_get("updated_at").map_err(get)?,
    })
}

fn application_from_row(row: &PgRow) -> Result<Application, StoreError> {
    let get = |e| decode_error("application", e);
    let status: String = row.try_get("status").map_err(get)?;
    let version: i64 = row.try_get("version").map_err(get)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(get)?;

    Ok(Application {
        id: ApplicationId::from_uuid(row.try_get("id").map_err(get)?),
        applicant: AccountId::from_uuid(row.try_get("applicant_id").map_err(get)?),
        service: ServiceId::from_uuid(row.try_get("service_id").map_err(get)?),
        status: ApplicationStatus::from_str(&status)?,
        created_at,
        updated_at: row.try_get("updated_at").map_err(get)?,
        version: u64::try_from(version)
            .map_err(|_| StoreError::Backend(format!("negative application version {version}")))?,
    })
}

fn version_param(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version).map_err(|_| StoreError::Backend(format!("version {version} out of range")))
}

#[async_trait]
impl AccountStore for PostgresStores {
    #[instrument(skip(self, account), fields(account_id = %account.id), err)]
    async fn insert(&self, account: Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, display_name, email, credential_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*account.id.as_uuid())
        .bind(account.display_name.as_str())
        .bind(account.email.as_str())
        .bind(&account.credential_hash)
        .bind(account.role.as_str())
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_account", e))?;
        Ok(())
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_account", e))?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"))
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_account_by_email", e))?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_display_name(&self, name: &DisplayName) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE display_name = $1"
        ))
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_account_by_display_name", e))?;
        row.as_ref().map(account_from_row).transpose()
    }
}

#[async_trait]
impl CatalogStore for PostgresStores {
    #[instrument(skip(self, service), fields(service_id = %service.id), err)]
    async fn insert(&self, service: ServiceDefinition) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO services
                (id, title, description, required_documents, fee, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(*service.id.as_uuid())
        .bind(&service.title)
        .bind(&service.description)
        .bind(&service.required_documents)
        .bind(service.fee)
        .bind(*service.created_by.as_uuid())
        .bind(service.created_at)
        .bind(service.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_service", e))?;
        Ok(())
    }

    async fn get(&self, id: ServiceId) -> Result<Option<ServiceDefinition>, StoreError> {
        let row = sqlx::query(&format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_service", e))?;
        row.as_ref().map(service_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<ServiceDefinition>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_services", e))?;
        rows.iter().map(service_from_row).collect()
    }

    #[instrument(skip(self, service), fields(service_id = %service.id), err)]
    async fn update(&self, service: ServiceDefinition) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE services
            SET title = $2, description = $3, required_documents = $4, fee = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(*service.id.as_uuid())
        .bind(&service.title)
        .bind(&service.description)
        .bind(&service.required_documents)
        .bind(service.fee)
        .bind(service.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_service", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("service"));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(service_id = %id), err)]
    async fn delete(&self, id: ServiceId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_service", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ApplicationStore for PostgresStores {
    #[instrument(skip(self, application), fields(application_id = %application.id), err)]
    async fn insert(&self, application: Application) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO applications
                (id, applicant_id, service_id, status, created_at, updated_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*application.id.as_uuid())
        .bind(*application.applicant.as_uuid())
        .bind(*application.service.as_uuid())
        .bind(application.status.as_str())
        .bind(application.created_at)
        .bind(application.updated_at)
        .bind(version_param(application.version)?)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_application", e))?;
        Ok(())
    }

    async fn get(&self, id: ApplicationId) -> Result<Option<Application>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_application", e))?;
        row.as_ref().map(application_from_row).transpose()
    }

    async fn list_by_applicant(&self, applicant: AccountId) -> Result<Vec<Application>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications \
             WHERE applicant_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(*applicant.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_applications_by_applicant", e))?;
        rows.iter().map(application_from_row).collect()
    }

    async fn list_all(&self) -> Result<Vec<Application>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_applications", e))?;
        rows.iter().map(application_from_row).collect()
    }

    async fn exists_for(&self, applicant: AccountId, service: ServiceId) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM applications WHERE applicant_id = $1 AND service_id = $2) AS present",
        )
        .bind(*applicant.as_uuid())
        .bind(*service.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("application_exists", e))?;
        row.try_get("present")
            .map_err(|e| decode_error("application_exists", e))
    }

    #[instrument(skip(self, application), fields(application_id = %application.id), err)]
    async fn update(&self, application: Application, expected: ExpectedVersion) -> Result<(), StoreError> {
        let expected_param = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(version_param(v)?),
        };

        let result = sqlx::query(
            r#"
            UPDATE applications
            SET status = $2, updated_at = $3, version = $4
            WHERE id = $1 AND ($5::BIGINT IS NULL OR version = $5)
            "#,
        )
        .bind(*application.id.as_uuid())
        .bind(application.status.as_str())
        .bind(application.updated_at)
        .bind(version_param(application.version)?)
        .bind(expected_param)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_application", e))?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Nothing matched: distinguish a vanished row from a stale version.
        match ApplicationStore::get(self, application.id).await? {
            Some(current) => Err(StoreError::Conflict(format!(
                "expected version {expected:?}, found {}",
                current.version
            ))),
            None => Err(StoreError::NotFound("application")),
        }
    }
}
