//! Application configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables for production.
//! Config precedence: env vars > .env file > config.toml > defaults

use serde::Deserialize;
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Get the global application configuration.
///
/// # Panics
/// Panics if config has not been initialized via [`init`].
pub fn get() -> &'static AppConfig {
    CONFIG
        .get()
        .expect("Config not initialized. Call veil_common::config::init() first.")
}

/// Initialize the global configuration from environment.
///
/// Should be called once at application startup, before any other code accesses config.
pub fn init() -> Result<&'static AppConfig, config::ConfigError> {
    let _ = dotenvy::dotenv();

    let cfg = config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("database.max_connections", 20)?
        .set_default("database.min_connections", 5)?
        .set_default("auth.session_token_ttl_secs", 12 * 60 * 60)? // 12h
        .set_default("auth.handoff_token_ttl_secs", 5 * 60)? // 5 min
        .set_default("auth.otp_expiry_minutes", 10)?
        .set_default("auth.otp_digits", 6)?
        .set_default("auth.otp_pepper", "")?
        .set_default("matchmaker.queue_capacity", 1000)?
        .set_default("matchmaker.tick_interval_ms", 100)?
        .set_default("matchmaker.waiter_max_age_secs", 5 * 60)?
        .set_default("hub.outbound_capacity", 256)?
        .set_default("rate_limit.requests", 120)?
        .set_default("rate_limit.window_seconds", 60)?
        .set_default("dev_mode", false)?
        .add_source(config::File::with_name("config").required(false))
        .add_source(
            config::Environment::with_prefix("VEIL")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app_config: AppConfig = cfg.try_deserialize()?;
    Ok(CONFIG.get_or_init(|| app_config))
}

/// Build a config for tests without touching the environment or the
/// process-wide `OnceLock`.
#[cfg(test)]
pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseConfig {
            url: "postgres://localhost/veil_test".into(),
            max_connections: 5,
            min_connections: 1,
        },
        auth: AuthConfig {
            jwt_signing_key: "test-signing-key-at-least-32-bytes-long!".into(),
            session_token_ttl_secs: 3600,
            handoff_token_ttl_secs: 300,
            otp_expiry_minutes: 10,
            otp_digits: 6,
            otp_pepper: String::new(),
        },
        matchmaker: MatchmakerConfig {
            queue_capacity: 1000,
            tick_interval_ms: 100,
            waiter_max_age_secs: 300,
        },
        hub: HubConfig {
            outbound_capacity: 256,
        },
        rate_limit: RateLimitConfig {
            requests: 120,
            window_seconds: 60,
        },
        server_rsa_priv_path: None,
        tls_cert_path: None,
        tls_key_path: None,
        dev_mode: true,
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub matchmaker: MatchmakerConfig,
    pub hub: HubConfig,
    pub rate_limit: RateLimitConfig,
    /// Optional path to a PEM-encoded RSA private key for the legacy
    /// encrypted-bundle-upload path. Only the public key is ever served.
    pub server_rsa_priv_path: Option<String>,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,
    /// Development builds may echo the OTP in the registration response.
    #[serde(default)]
    pub dev_mode: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HMAC signing secret for session & handoff tokens (>=32 bytes in production).
    pub jwt_signing_key: String,
    pub session_token_ttl_secs: u64,
    pub handoff_token_ttl_secs: u64,
    pub otp_expiry_minutes: u64,
    pub otp_digits: u8,
    /// HMAC pepper for one-time registration codes. If left empty, derived
    /// from `jwt_signing_key` so a deployment only has to manage one
    /// secret; set explicitly to rotate the pepper independently.
    #[serde(default)]
    pub otp_pepper: String,
}

impl AuthConfig {
    /// The bytes actually used as the HMAC pepper for one-time codes.
    pub fn otp_pepper_bytes(&self) -> Vec<u8> {
        if self.otp_pepper.is_empty() {
            use sha2::{Digest, Sha256};
            Sha256::digest(self.jwt_signing_key.as_bytes()).to_vec()
        } else {
            self.otp_pepper.as_bytes().to_vec()
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchmakerConfig {
    pub queue_capacity: usize,
    pub tick_interval_ms: u64,
    pub waiter_max_age_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HubConfig {
    pub outbound_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub requests: u32,
    pub window_seconds: u32,
}
