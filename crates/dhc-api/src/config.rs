//! Service configuration from the environment

use std::env;
use std::time::Duration;

use chrono_tz::Tz;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable {0}")]
    Invalid(&'static str),
}

/// Runtime configuration for the connector service
#[derive(Debug, Clone)]
pub struct Config {
    pub epr_service_adapter_url_base: String,
    pub epr_service_adapter_hs_key: String,
    pub epr_service_adapter_issuer: String,
    pub jwt_expiry_seconds: u64,

    /// Empty disables the CDA surface (501)
    pub mirth_host_url_base: String,
    pub mirth_username: String,
    pub mirth_password: String,

    /// Default zone for zoneless HL7 timestamps
    pub server_timezone: Tz,
    /// Named transformer applied to raw HL7 text in both directions
    pub hl7_transformer: String,

    pub customer_code: String,
    pub trustomer_api_host: String,
    pub trustomer_api_key: String,
    pub trustomer_cache_ttl: Duration,

    /// Non-production fallback when the adapter scope is not cached
    pub mock_epr_service_adapter_scope: Option<String>,
    pub is_production: bool,

    pub database_url: String,
    pub listen_address: String,
}

impl Config {
    /// Load the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_timezone: Tz = required("SERVER_TIMEZONE")?
            .parse()
            .map_err(|_| ConfigError::Invalid("SERVER_TIMEZONE"))?;

        Ok(Self {
            epr_service_adapter_url_base: required("EPR_SERVICE_ADAPTER_URL_BASE")?,
            epr_service_adapter_hs_key: required("EPR_SERVICE_ADAPTER_HS_KEY")?,
            epr_service_adapter_issuer: required("EPR_SERVICE_ADAPTER_ISSUER")?,
            jwt_expiry_seconds: parsed_or("JWT_EXPIRY_IN_SECONDS", 600)?,
            mirth_host_url_base: optional("MIRTH_HOST_URL_BASE").unwrap_or_default(),
            mirth_username: optional("MIRTH_USERNAME").unwrap_or_default(),
            mirth_password: optional("MIRTH_PASSWORD").unwrap_or_default(),
            server_timezone,
            hl7_transformer: optional("HL7_TRANSFORMER_MODULE")
                .unwrap_or_else(|| "identity".to_string()),
            customer_code: required("CUSTOMER_CODE")?,
            trustomer_api_host: required("TRUSTOMER_API_HOST")?,
            trustomer_api_key: required("TRUSTOMER_API_KEY")?,
            trustomer_cache_ttl: Duration::from_secs(parsed_or(
                "TRUSTOMER_CONFIG_CACHE_TTL_SEC",
                3600,
            )?),
            mock_epr_service_adapter_scope: optional("MOCK_EPR_SERVICE_ADAPTER_SCOPE"),
            is_production: optional("ENVIRONMENT").as_deref() == Some("production"),
            database_url: required("DATABASE_URL")?,
            listen_address: optional("LISTEN_ADDRESS")
                .unwrap_or_else(|| "0.0.0.0:5000".to_string()),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn parsed_or(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match optional(name) {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid(name)),
        None => Ok(default),
    }
}
