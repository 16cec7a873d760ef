//! Process configuration read from the environment (after `.env` is loaded).

use std::path::PathBuf;

use crate::error::AppError;
use crate::logging::config::LogConfig;
use crate::services::MailerConfig;

/// Shortest bootstrap secret accepted in production.
pub const MIN_BOOTSTRAP_SECRET_LEN: usize = 16;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub blob_dir: PathBuf,
    pub public_base_url: String,
    pub bcrypt_cost: u32,
    pub admin_bootstrap_secret: Option<String>,
    pub mailer: MailerConfig,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = env_or("ENVIRONMENT", "development");
        let host = env_or("HOST", "127.0.0.1");
        let port = env_parse("PORT", 3001u16);
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", host, port));

        Self {
            log: LogConfig::from_env(&environment),
            environment,
            host,
            port,
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            blob_dir: PathBuf::from(env_or("BLOB_DIR", "storage")),
            public_base_url,
            bcrypt_cost: env_parse("BCRYPT_COST", bcrypt::DEFAULT_COST),
            admin_bootstrap_secret: std::env::var("ADMIN_BOOTSTRAP_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            mailer: MailerConfig::default(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Production refuses a weak bootstrap secret and warns when email
    /// delivery is not configured.
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.is_production() {
            return Ok(());
        }

        if let Some(secret) = self.admin_bootstrap_secret.as_deref() {
            if secret.chars().count() < MIN_BOOTSTRAP_SECRET_LEN {
                return Err(AppError::Configuration(format!(
                    "ADMIN_BOOTSTRAP_SECRET must be at least {} characters in production",
                    MIN_BOOTSTRAP_SECRET_LEN
                )));
            }
            tracing::warn!(
                "SECURITY: ADMIN_BOOTSTRAP_SECRET is set. Unset it once an admin account exists."
            );
        }

        if self.mailer.api_key.is_none() {
            tracing::warn!("BREVO_API_KEY is not set. Password reset emails cannot be sent.");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn production() -> AppConfig {
        let mut config = AppConfig::from_env();
        config.environment = "production".to_string();
        config.admin_bootstrap_secret = None;
        config
    }

    #[test]
    fn test_from_env_has_sane_defaults() {
        let config = AppConfig::from_env();
        assert!(config.port > 0);
        assert!(config.bcrypt_cost >= 4);
        assert!(!config.public_base_url.is_empty());
    }

    #[test]
    fn test_production_rejects_short_bootstrap_secret() {
        let mut config = production();
        config.admin_bootstrap_secret = Some("short".to_string());
        assert!(matches!(config.validate(), Err(AppError::Configuration(_))));

        config.admin_bootstrap_secret = Some("x".repeat(MIN_BOOTSTRAP_SECRET_LEN));
        assert!(config.validate().is_ok());

        config.admin_bootstrap_secret = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_development_skips_checks() {
        let mut config = production();
        config.environment = "development".to_string();
        config.admin_bootstrap_secret = Some("short".to_string());
        assert!(config.validate().is_ok());
    }
}
