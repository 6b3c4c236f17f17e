use std::time::Duration as StdDuration;

use chrono::Duration;
use config::ConfigError;
use jsonwebtoken::Algorithm;

use crate::auth::{PasswordHasher, TokenCodec};
use crate::error::AppError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub password: PasswordSettings,
    #[serde(default)]
    pub revocation: RevocationSettings,
    pub email_client: EmailClientSettings,
    pub assistant: AssistantSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// Verbose logging when RUST_LOG is not set
    #[serde(default)]
    pub debug: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    20
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    /// Server-level URL, used to create throwaway test databases
    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// JWT authentication settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default = "default_access_expiry")]
    pub access_token_expiry_minutes: i64,
    #[serde(default = "default_refresh_expiry")]
    pub refresh_token_expiry_minutes: i64,
    #[serde(default = "default_recovery_expiry")]
    pub recovery_token_expiry_minutes: i64,
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_access_expiry() -> i64 {
    60
}

fn default_refresh_expiry() -> i64 {
    43200 // 30 days
}

fn default_recovery_expiry() -> i64 {
    30
}

impl JwtSettings {
    pub fn access_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_expiry_minutes)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::minutes(self.refresh_token_expiry_minutes)
    }

    pub fn recovery_ttl(&self) -> Duration {
        Duration::minutes(self.recovery_token_expiry_minutes)
    }

    /// Build the token codec, rejecting unknown or asymmetric algorithms
    pub fn codec(&self) -> Result<TokenCodec, AppError> {
        let algorithm: Algorithm = self.algorithm.parse().map_err(|_| {
            crate::error::ConfigError::InvalidValue(format!(
                "unknown jwt algorithm {}",
                self.algorithm
            ))
        })?;
        TokenCodec::new(self.secret.as_bytes(), algorithm)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct PasswordSettings {
    pub bcrypt_cost: u32,
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self {
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl PasswordSettings {
    pub fn hasher(&self) -> Result<PasswordHasher, AppError> {
        PasswordHasher::new(self.bcrypt_cost)
    }
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RevocationBackend {
    /// Shared `revoked_tokens` table, correct behind a load balancer
    Postgres,
    /// Process-local set, lost on restart
    Memory,
}

#[derive(serde::Deserialize, Clone)]
pub struct RevocationSettings {
    pub backend: RevocationBackend,
    pub prune_interval_seconds: u64,
}

impl Default for RevocationSettings {
    fn default() -> Self {
        Self {
            backend: RevocationBackend::Postgres,
            prune_interval_seconds: 300,
        }
    }
}

impl RevocationSettings {
    pub fn prune_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.prune_interval_seconds.max(1))
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub sender_email: String,
    /// Frontend page that accepts `?token=` for password recovery
    pub recovery_url: String,
    #[serde(default = "default_email_timeout")]
    pub timeout_milliseconds: u64,
}

fn default_email_timeout() -> u64 {
    10_000
}

impl EmailClientSettings {
    pub fn timeout(&self) -> StdDuration {
        StdDuration::from_millis(self.timeout_milliseconds)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct AssistantSettings {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub assistant_id: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_milliseconds: u64,
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_max_polls() -> u32 {
    120
}

impl AssistantSettings {
    pub fn poll_interval(&self) -> StdDuration {
        StdDuration::from_millis(self.poll_interval_milliseconds)
    }
}

/// Load settings from `configuration.yaml` (optional) and `APP_*` variables,
/// e.g. `APP_JWT__SECRET` or `APP_DATABASE__PORT`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
