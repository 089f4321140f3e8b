//! API configuration
//!
//! Every setting can be overridden with a `LEDGER_`-prefixed environment
//! variable, e.g. `LEDGER_PORT=9000` or `LEDGER_TIMEZONE=Europe/London`.

use serde::Deserialize;

use core_kernel::{CoreError, Currency, Timezone};
use domain_ledger::service::MAX_PAGE_SIZE;
use domain_ledger::{LedgerConfig, CLOSE_OFF_MARKER};

/// Log output format for the server binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    pub database_url: String,
    pub database_max_connections: u32,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Firm timezone; decides import run dates and rate effective dates
    pub timezone: Timezone,
    pub currency: Currency,
    /// Linked id stored on Close-off entries that carry none
    pub close_off_marker: String,
    pub default_page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/ledger".to_string(),
            database_max_connections: 10,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            timezone: Timezone::default(),
            currency: Currency::default(),
            close_off_marker: CLOSE_OFF_MARKER.to_string(),
            default_page_size: 100,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `LEDGER_*` environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("LEDGER").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Rejects settings the server cannot start with
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(CoreError::configuration("jwt_secret must not be empty"));
        }
        if self.close_off_marker.trim().is_empty() {
            return Err(CoreError::configuration("close_off_marker must not be empty"));
        }
        if self.default_page_size == 0 || self.default_page_size > MAX_PAGE_SIZE {
            return Err(CoreError::configuration(format!(
                "default_page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if self.database_max_connections == 0 {
            return Err(CoreError::configuration("database_max_connections must be at least 1"));
        }
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings handed to the ledger service
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            timezone: self.timezone,
            currency: self.currency,
            close_off_marker: self.close_off_marker.clone(),
            default_page_size: self.default_page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.ledger_config(), LedgerConfig::default());
    }

    #[test]
    fn test_validate_rejects_unusable_settings() {
        assert!(ApiConfig::default().validate().is_ok());

        let blank_secret = ApiConfig {
            jwt_secret: " ".to_string(),
            ..ApiConfig::default()
        };
        assert!(matches!(blank_secret.validate(), Err(CoreError::Configuration(_))));

        let huge_page = ApiConfig {
            default_page_size: MAX_PAGE_SIZE + 1,
            ..ApiConfig::default()
        };
        assert!(huge_page.validate().is_err());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config: ApiConfig = config::Config::builder()
            .set_override("port", 9000)
            .unwrap()
            .set_override("timezone", "Europe/London")
            .unwrap()
            .set_override("log_format", "json")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.timezone, "Europe/London".parse::<Timezone>().unwrap());
        assert_eq!(config.host, "0.0.0.0");
    }
}
