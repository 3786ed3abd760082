use std::time::Duration;

use sea_orm::ConnectOptions;
use serde::Deserialize;

use suficiencia_auth_types::token::{DurationSpec, InvalidDuration, TokenService};
use suficiencia_core::config::Config;

/// API service configuration loaded from environment variables.
///
/// Field names map to upper-case env vars (`jwt_secret` reads `JWT_SECRET`).
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// `production` hides internal error details from responses.
    #[serde(default = "default_app_env")]
    pub app_env: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,

    /// HMAC secret for access tokens.
    pub jwt_secret: String,
    #[serde(default = "default_jwt_expiry")]
    pub jwt_expiry: DurationSpec,
    /// HMAC secret for refresh tokens. Must differ from `jwt_secret`.
    #[serde(default)]
    pub jwt_refresh_secret: Option<String>,
    #[serde(default = "default_jwt_refresh_expiry")]
    pub jwt_refresh_expiry: DurationSpec,

    /// Value expected in the `x-api-key` header.
    pub api_key: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// External identity directory. Local password check when unset.
    #[serde(default)]
    pub identity_provider_url: Option<String>,
}

impl Config for ApiConfig {}

fn default_app_env() -> String {
    "development".to_owned()
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    3000
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_db_idle_timeout_secs() -> u64 {
    300
}

fn default_jwt_expiry() -> DurationSpec {
    DurationSpec::Text("15m".to_owned())
}

fn default_jwt_refresh_expiry() -> DurationSpec {
    DurationSpec::Text("7d".to_owned())
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_bcrypt_cost() -> u32 {
    12
}

fn default_page_size() -> u32 {
    suficiencia_domain::pagination::DEFAULT_LIMIT
}

fn default_max_page_size() -> u32 {
    suficiencia_domain::pagination::MAX_LIMIT
}

/// Startup refusals after the environment parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must not be empty")]
    MissingSecret,
    #[error("JWT_REFRESH_SECRET must be set")]
    MissingRefreshSecret,
    #[error("JWT_REFRESH_SECRET must differ from JWT_SECRET")]
    SharedRefreshSecret,
    #[error("API_KEY must not be empty")]
    MissingApiKey,
    #[error("{var}: {source}")]
    Duration {
        var: &'static str,
        #[source]
        source: InvalidDuration,
    },
    #[error("BCRYPT_COST must be between 4 and 31")]
    BcryptCost,
}

/// Secrets and lifetimes checked and resolved.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub config: ApiConfig,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl ApiConfig {
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        let refresh_secret = self
            .jwt_refresh_secret
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingRefreshSecret)?;
        if refresh_secret == self.jwt_secret {
            return Err(ConfigError::SharedRefreshSecret);
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigError::BcryptCost);
        }
        let access_ttl = self
            .jwt_expiry
            .to_duration()
            .map_err(|source| ConfigError::Duration {
                var: "JWT_EXPIRY",
                source,
            })?;
        let refresh_ttl =
            self.jwt_refresh_expiry
                .to_duration()
                .map_err(|source| ConfigError::Duration {
                    var: "JWT_REFRESH_EXPIRY",
                    source,
                })?;
        Ok(ValidatedConfig {
            config: self,
            refresh_secret,
            access_ttl,
            refresh_ttl,
        })
    }
}

impl ValidatedConfig {
    pub fn token_service(&self) -> TokenService {
        TokenService::new(
            &self.config.jwt_secret,
            &self.refresh_secret,
            self.access_ttl,
            self.refresh_ttl,
        )
    }

    pub fn connect_options(&self) -> ConnectOptions {
        let mut opts = ConnectOptions::new(self.config.database_url.clone());
        opts.max_connections(self.config.db_max_connections)
            .acquire_timeout(Duration::from_secs(self.config.db_acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(self.config.db_idle_timeout_secs))
            .sqlx_logging(false);
        opts
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }
}
