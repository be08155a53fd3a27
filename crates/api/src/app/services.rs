//! Infrastructure wiring: stores, hasher, token issuer and the portal.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use civicdesk_auth::{Argon2Hasher, CredentialError, CredentialHasher, Hs256Jwt};
use civicdesk_core::SystemClock;
use civicdesk_infra::{Portal, PortalError, PostgresStores, StoreError, Stores};

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to open the database: {0}")]
    Store(#[from] StoreError),

    #[error("invalid credential hashing parameters: {0}")]
    Hasher(#[from] CredentialError),

    #[error("failed to provision the bootstrap officer: {0}")]
    Bootstrap(#[from] PortalError),
}

/// Shared, request-independent services.
pub struct AppServices {
    pub portal: Portal,
    pub jwt: Arc<Hs256Jwt>,
}

async fn build_stores(config: &AppConfig) -> Result<Stores, StoreError> {
    match &config.database {
        Some(db) => {
            let stores = PostgresStores::connect(&db.url, db.max_connections).await?;
            info!(max_connections = db.max_connections, "using postgres stores");
            Ok(Stores::postgres(stores))
        }
        None => {
            info!("DATABASE_URL not set; using in-memory stores");
            Ok(Stores::in_memory())
        }
    }
}

fn build_hasher(config: &AppConfig) -> Result<Arc<dyn CredentialHasher>, CredentialError> {
    let hasher = match config.hash_cost {
        Some(cost) => Argon2Hasher::with_cost(cost.memory_kib, cost.iterations)?,
        None => Argon2Hasher::new(),
    };
    Ok(Arc::new(hasher))
}

pub async fn build_services(config: &AppConfig) -> Result<AppServices, StartupError> {
    let stores = build_stores(config).await?;
    let hasher = build_hasher(config)?;
    let jwt = Arc::new(Hs256Jwt::new(config.jwt_secret.as_bytes()));

    let portal = Portal::new(
        stores,
        hasher,
        jwt.clone(),
        Arc::new(SystemClock),
        config.portal,
    );

    if let Some(officer) = &config.bootstrap_officer {
        let account = portal
            .bootstrap_officer(&officer.display_name, &officer.email, &officer.credential)
            .await?;
        info!(account_id = %account.id, "bootstrap officer ready");
    }

    Ok(AppServices { portal, jwt })
}
