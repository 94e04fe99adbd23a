//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use chrono::Duration;
use std::net::SocketAddr;
use user_login::auth::{TokenCodec, codec::Algorithm};
use user_login::db::DatabaseConfig;

/// Default bind address of the HTTP server
pub const DEFAULT_BIND: &str = "127.0.0.1:8001";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Token configuration
    pub token: TokenConfig,
    /// Security configuration
    pub security: SecurityConfig,
    /// Optional integrations
    pub integrations: IntegrationsConfig,
    /// Allowed CORS origins; empty means permissive
    pub cors_allowed_origins: Vec<String>,
    /// Prometheus exporter address; `None` disables the exporter
    pub metrics_bind: Option<SocketAddr>,
}

/// Longest accepted token lifetime: one year
pub const MAX_EXPIRE_MINUTES: i64 = 525_600;

/// Access token settings
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Signing algorithm (HMAC family only)
    pub algorithm: Algorithm,
    /// Access token lifetime in minutes
    pub expire_minutes: i64,
}

impl TokenConfig {
    pub fn ttl(&self) -> Duration {
        Duration::try_minutes(self.expire_minutes).unwrap_or(Duration::MAX)
    }
}

/// Security-related configuration
#[derive(Clone)]
pub struct SecurityConfig {
    /// JWT signing secret (required)
    pub jwt_secret: String,
    /// Password hashing pepper (required)
    pub password_pepper: String,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"***")
            .field("password_pepper", &"***")
            .finish()
    }
}

/// Third-party services that are switched off when unconfigured
#[derive(Debug, Clone, Default)]
pub struct IntegrationsConfig {
    /// Firebase project whose ID tokens are accepted by `/login-google`
    pub firebase_project_id: Option<String>,
    /// Steam Web API key for `/steam/validate`
    pub steam_api_key: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_required_format("SERVER_BIND", DEFAULT_BIND)?,
        };

        let mut database = DatabaseConfig::from_env();
        if database_url_override.is_some() {
            database.database_url = database_url_override;
        }

        // Security configuration (REQUIRED)
        let jwt_secret =
            std::env::var("JWT_SECRET_KEY").map_err(|_| ConfigError::MissingRequired {
                var: "JWT_SECRET_KEY".to_string(),
                hint: "Generate with: openssl rand -hex 32".to_string(),
            })?;

        let password_pepper =
            std::env::var("PASSWORD_PEPPER").map_err(|_| ConfigError::MissingRequired {
                var: "PASSWORD_PEPPER".to_string(),
                hint: "Generate with: openssl rand -hex 16".to_string(),
            })?;

        let algorithm_name = std::env::var("ALGORITHM").unwrap_or_else(|_| "HS256".to_string());
        let algorithm =
            TokenCodec::parse_algorithm(&algorithm_name).map_err(|_| ConfigError::Invalid {
                var: "ALGORITHM".to_string(),
                reason: format!("Unknown algorithm '{algorithm_name}'"),
            })?;

        let expire_minutes = match std::env::var("ACCESS_TOKEN_EXPIRE_MINUTES") {
            Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "ACCESS_TOKEN_EXPIRE_MINUTES".to_string(),
                reason: format!("'{value}' is not a whole number of minutes"),
            })?,
            Err(_) => user_login::auth::codec::DEFAULT_TOKEN_TTL_MINUTES,
        };

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| parse_origins(&v))
            .unwrap_or_default();

        let metrics_bind = match std::env::var("METRICS_BIND") {
            Ok(value) if !value.trim().is_empty() => {
                Some(value.trim().parse().map_err(|_| ConfigError::Invalid {
                    var: "METRICS_BIND".to_string(),
                    reason: format!("'{value}' is not a socket address"),
                })?)
            }
            _ => None,
        };

        let config = ServerConfig {
            bind,
            database,
            token: TokenConfig {
                algorithm,
                expire_minutes,
            },
            security: SecurityConfig {
                jwt_secret,
                password_pepper,
            },
            integrations: IntegrationsConfig {
                firebase_project_id: non_empty_env("FIREBASE_PROJECT_ID"),
                steam_api_key: non_empty_env("STEAM_API_KEY"),
            },
            cors_allowed_origins,
            metrics_bind,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET_KEY".to_string(),
                reason: "Must be at least 32 characters (128-bit security)".to_string(),
            });
        }

        if self.security.password_pepper.len() < 16 {
            return Err(ConfigError::Invalid {
                var: "PASSWORD_PEPPER".to_string(),
                reason: "Must be at least 16 characters (64-bit security)".to_string(),
            });
        }

        if !matches!(
            self.token.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(ConfigError::Invalid {
                var: "ALGORITHM".to_string(),
                reason: "Only HS256, HS384 and HS512 are supported".to_string(),
            });
        }

        if !(1..=MAX_EXPIRE_MINUTES).contains(&self.token.expire_minutes) {
            return Err(ConfigError::Invalid {
                var: "ACCESS_TOKEN_EXPIRE_MINUTES".to_string(),
                reason: format!("Must be between 1 and {MAX_EXPIRE_MINUTES}"),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    self.database.max_connections
                ),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse a variable that must be well-formed when present
fn parse_env_required_format<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        var: key.to_string(),
        reason: format!("Cannot parse '{raw}'"),
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Split a comma-separated origin list; `*` means any origin.
fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty() && *origin != "*")
        .map(str::to_string)
        .collect()
}
