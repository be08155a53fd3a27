//! Process configuration, read from the environment (and `.env` if present).

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderValue;
use chrono::Duration;
use thiserror::Error;

use civicdesk_applications::{LifecyclePolicy, TransitionPolicy};
use civicdesk_identity::RegistrationPolicy;
use civicdesk_infra::PortalSettings;
use civicdesk_observability::{LogConfig, LogFormat};

const DEV_JWT_SECRET: &str = "civicdesk-dev-secret";
const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,

    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost(#[source] std::net::AddrParseError),

    #[error("JWT_SECRET must be set in production")]
    MissingJwtSecret,

    #[error("{name} is invalid: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("BOOTSTRAP_OFFICER_EMAIL, BOOTSTRAP_OFFICER_NAME and BOOTSTRAP_OFFICER_CREDENTIAL must be set together")]
    IncompleteBootstrapOfficer,
}

fn invalid(name: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        reason: reason.to_string(),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self.host.parse().map_err(ConfigError::InvalidHost)?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// argon2 cost override (memory in KiB, iterations).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
}

/// Officer account provisioned at startup.
#[derive(Clone)]
pub struct BootstrapOfficer {
    pub display_name: String,
    pub email: String,
    pub credential: String,
}

impl std::fmt::Debug for BootstrapOfficer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapOfficer")
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub jwt_secret: String,
    /// Set when `JWT_SECRET` was absent and the dev default is in use.
    pub jwt_secret_is_default: bool,
    /// Browser origins allowed by CORS. Empty allows any origin.
    pub frontend_origins: Vec<HeaderValue>,
    /// `None` selects the in-memory stores.
    pub database: Option<DatabaseConfig>,
    pub portal: PortalSettings,
    pub hash_cost: Option<HashCost>,
    pub bootstrap_officer: Option<BootstrapOfficer>,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let environment = AppEnvironment::parse(&var("APP_ENV").unwrap_or_default());

        let host = var("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match var("APP_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort)?,
            None => 8080,
        };

        let (jwt_secret, jwt_secret_is_default) = match var("JWT_SECRET") {
            Some(secret) => (secret, false),
            None if environment == AppEnvironment::Production => {
                return Err(ConfigError::MissingJwtSecret);
            }
            None => (DEV_JWT_SECRET.to_string(), true),
        };

        let token_ttl = match var("TOKEN_TTL_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<i64>().map_err(|e| invalid("TOKEN_TTL_SECS", e))?;
                if secs <= 0 {
                    return Err(invalid("TOKEN_TTL_SECS", "must be positive"));
                }
                if secs > MAX_TOKEN_TTL_SECS {
                    return Err(invalid(
                        "TOKEN_TTL_SECS",
                        format!("must not exceed {MAX_TOKEN_TTL_SECS}"),
                    ));
                }
                Duration::try_seconds(secs).ok_or_else(|| invalid("TOKEN_TTL_SECS", "out of range"))?
            }
            None => Duration::days(1),
        };

        let frontend_origins = match var("FRONTEND_URL") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(|origin| {
                    HeaderValue::from_str(origin.trim_end_matches('/'))
                        .map_err(|e| invalid("FRONTEND_URL", e))
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let database = match var("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_or("DATABASE_MAX_CONNECTIONS", var("DATABASE_MAX_CONNECTIONS"), 5)?,
            }),
            None => None,
        };

        let registration = match var("REGISTRATION_POLICY") {
            Some(raw) => raw
                .parse::<RegistrationPolicy>()
                .map_err(|e| invalid("REGISTRATION_POLICY", e))?,
            None => RegistrationPolicy::default(),
        };
        let transitions = match var("TRANSITION_POLICY") {
            Some(raw) => raw
                .parse::<TransitionPolicy>()
                .map_err(|e| invalid("TRANSITION_POLICY", e))?,
            None => TransitionPolicy::default(),
        };
        let allow_duplicate_applications = parse_or(
            "ALLOW_DUPLICATE_APPLICATIONS",
            var("ALLOW_DUPLICATE_APPLICATIONS"),
            true,
        )?;

        let hash_cost = match (var("HASH_MEMORY_KIB"), var("HASH_ITERATIONS")) {
            (None, None) => None,
            (memory, iterations) => Some(HashCost {
                memory_kib: parse_or("HASH_MEMORY_KIB", memory, 19 * 1024)?,
                iterations: parse_or("HASH_ITERATIONS", iterations, 2)?,
            }),
        };

        let bootstrap_officer = match (
            var("BOOTSTRAP_OFFICER_NAME"),
            var("BOOTSTRAP_OFFICER_EMAIL"),
            var("BOOTSTRAP_OFFICER_CREDENTIAL"),
        ) {
            (None, None, None) => None,
            (Some(display_name), Some(email), Some(credential)) => Some(BootstrapOfficer {
                display_name,
                email,
                credential,
            }),
            _ => return Err(ConfigError::IncompleteBootstrapOfficer),
        };

        let log = LogConfig {
            format: match var("LOG_FORMAT") {
                Some(raw) => raw.parse::<LogFormat>().map_err(|e| invalid("LOG_FORMAT", e))?,
                None => LogFormat::default(),
            },
            default_filter: var("APP_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            jwt_secret,
            jwt_secret_is_default,
            frontend_origins,
            database,
            portal: PortalSettings {
                registration,
                lifecycle: LifecyclePolicy {
                    transitions,
                    allow_duplicate_applications,
                },
                token_ttl,
            },
            hash_cost,
            bootstrap_officer,
            log,
        })
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| invalid(name, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_env_missing() {
        let config = load(&[]).unwrap();
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert!(config.database.is_none());
        assert_eq!(config.portal, PortalSettings::default());
        assert!(config.hash_cost.is_none());
        assert!(config.bootstrap_officer.is_none());
        assert!(config.frontend_origins.is_empty());
    }

    #[test]
    fn missing_secret_is_flagged_outside_production() {
        let config = load(&[]).unwrap();
        assert!(config.jwt_secret_is_default);
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);

        let config = load(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert!(!config.jwt_secret_is_default);
    }

    #[test]
    fn token_ttl_beyond_a_year_is_rejected() {
        for raw in ["31536001", "9000000000000", "10000000000000000"] {
            assert!(
                matches!(
                    load(&[("TOKEN_TTL_SECS", raw)]),
                    Err(ConfigError::InvalidValue { name: "TOKEN_TTL_SECS", .. })
                ),
                "{raw}"
            );
        }
        let config = load(&[("TOKEN_TTL_SECS", "31536000")]).unwrap();
        assert_eq!(config.portal.token_ttl, Duration::days(365));
    }

    #[test]
    fn frontend_origins_are_split_and_trimmed() {
        let config = load(&[("FRONTEND_URL", "http://localhost:5173/, https://portal.gov.example")]).unwrap();
        assert_eq!(
            config.frontend_origins,
            vec![
                HeaderValue::from_static("http://localhost:5173"),
                HeaderValue::from_static("https://portal.gov.example"),
            ]
        );
    }

    #[test]
    fn accepts_localhost_host() {
        let config = load(&[("APP_HOST", "localhost"), ("APP_PORT", "3000")]).unwrap();
        let addr = config.server.socket_addr().unwrap();
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(matches!(load(&[("APP_PORT", "http")]), Err(ConfigError::InvalidPort)));
    }

    #[test]
    fn production_requires_a_secret() {
        assert!(matches!(
            load(&[("APP_ENV", "production")]),
            Err(ConfigError::MissingJwtSecret)
        ));
    }

    #[test]
    fn policies_are_read_from_env() {
        let config = load(&[
            ("REGISTRATION_POLICY", "open"),
            ("TRANSITION_POLICY", "terminal"),
            ("ALLOW_DUPLICATE_APPLICATIONS", "false"),
            ("TOKEN_TTL_SECS", "600"),
        ])
        .unwrap();

        assert_eq!(config.portal.registration, RegistrationPolicy::Open);
        assert_eq!(config.portal.lifecycle.transitions, TransitionPolicy::TerminalDecisions);
        assert!(!config.portal.lifecycle.allow_duplicate_applications);
        assert_eq!(config.portal.token_ttl, Duration::seconds(600));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(matches!(
            load(&[("REGISTRATION_POLICY", "anyone")]),
            Err(ConfigError::InvalidValue { name: "REGISTRATION_POLICY", .. })
        ));
    }

    #[test]
    fn partial_bootstrap_officer_is_rejected() {
        assert!(matches!(
            load(&[("BOOTSTRAP_OFFICER_EMAIL", "olga@gov.example")]),
            Err(ConfigError::IncompleteBootstrapOfficer)
        ));
    }
}
