//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREKEEP_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREKEEP_BASE_URL` - Public URL of the API
//!
//! ## Optional
//! - `STOREKEEP_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREKEEP_PORT` - Listen port (default: 3000)
//! - `STOREKEEP_TAX_RATE` - Tax as a fraction of the subtotal (default: 0.08)
//! - `STOREKEEP_FREE_SHIPPING_THRESHOLD` - Subtotal that ships free (default: 100)
//! - `STOREKEEP_FLAT_SHIPPING_FEE` - Shipping below the threshold (default: 9.99)
//! - `STOREKEEP_LOG_FORMAT` - `pretty` or `json` (default: pretty)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use storekeep_core::{PricingPolicy, parse_amount};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, for terminals.
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'pretty' or 'json', got '{other}'")),
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API
    pub base_url: Url,
    /// Tax and shipping settings
    pub pricing: PricingPolicy,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let database_url = env
            .optional("STOREKEEP_DATABASE_URL")
            .or_else(|| env.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("STOREKEEP_DATABASE_URL".to_string()))?;

        let host = env.parse_or("STOREKEEP_HOST", "127.0.0.1", IpAddr::from_str)?;
        let port = env.parse_or("STOREKEEP_PORT", "3000", u16::from_str)?;
        let base_url = env.parse("STOREKEEP_BASE_URL", Url::parse)?;

        let pricing = PricingPolicy {
            tax_rate: env.parse_or("STOREKEEP_TAX_RATE", "0.08", parse_tax_rate)?,
            free_shipping_threshold: env.parse_or(
                "STOREKEEP_FREE_SHIPPING_THRESHOLD",
                "100",
                parse_amount,
            )?,
            flat_shipping_fee: env.parse_or("STOREKEEP_FLAT_SHIPPING_FEE", "9.99", parse_amount)?,
        };

        let log_format = env.parse_or("STOREKEEP_LOG_FORMAT", "pretty", LogFormat::from_str)?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            pricing,
            log_format,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies must be marked `Secure`.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable. Blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Parse a required variable.
    fn parse<T, E, P>(&self, key: &str, parse: P) -> Result<T, ConfigError>
    where
        P: FnOnce(&str) -> Result<T, E>,
        E: std::fmt::Display,
    {
        let value = self
            .optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
        parse(value.trim()).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Parse a variable, falling back to a default.
    fn parse_or<T, E, P>(&self, key: &str, default: &str, parse: P) -> Result<T, ConfigError>
    where
        P: FnOnce(&str) -> Result<T, E>,
        E: std::fmt::Display,
    {
        let value = self.optional(key).unwrap_or_else(|| default.to_string());
        parse(value.trim()).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

/// Tax rate as a fraction in `[0, 1)`.
fn parse_tax_rate(s: &str) -> Result<Decimal, String> {
    let rate = Decimal::from_str(s).map_err(|e| e.to_string())?;
    if rate < Decimal::ZERO || rate >= Decimal::ONE {
        return Err(format!("tax rate must be in [0, 1), got {rate}"));
    }
    Ok(rate)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("STOREKEEP_DATABASE_URL", "postgres://localhost/storekeep"),
        ("STOREKEEP_BASE_URL", "http://localhost:3000"),
    ];

    #[test]
    fn test_defaults() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.pricing, PricingPolicy::default());
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.sentry_dsn.is_none());
        assert!(!config.secure_cookies());
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[
            ("DATABASE_URL", "postgres://fallback/db"),
            ("STOREKEEP_BASE_URL", "https://shop.example.com"),
        ])
        .unwrap();
        assert_eq!(config.database_url.expose_secret(), "postgres://fallback/db");
        assert!(config.secure_cookies());
    }

    #[test]
    fn test_missing_database_url() {
        let err = load(&[("STOREKEEP_BASE_URL", "http://localhost")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "STOREKEEP_DATABASE_URL"));
    }

    #[test]
    fn test_invalid_port() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("STOREKEEP_PORT", "eighty"));
        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "STOREKEEP_PORT"));
    }

    #[test]
    fn test_pricing_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("STOREKEEP_TAX_RATE", "0.2"),
            ("STOREKEEP_FREE_SHIPPING_THRESHOLD", "50"),
            ("STOREKEEP_FLAT_SHIPPING_FEE", "4.50"),
            ("STOREKEEP_LOG_FORMAT", "JSON"),
        ]);
        let config = load(&vars).unwrap();
        assert_eq!(config.pricing.tax_rate, Decimal::new(2, 1));
        assert_eq!(config.pricing.free_shipping_threshold, Decimal::from(50));
        assert_eq!(config.pricing.flat_shipping_fee, Decimal::new(450, 2));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_pricing_validation() {
        for (key, value) in [
            ("STOREKEEP_TAX_RATE", "1"),
            ("STOREKEEP_TAX_RATE", "-0.1"),
            ("STOREKEEP_FLAT_SHIPPING_FEE", "-1"),
            ("STOREKEEP_FREE_SHIPPING_THRESHOLD", "ten"),
        ] {
            let mut vars = REQUIRED.to_vec();
            vars.push((key, value));
            assert!(
                matches!(load(&vars), Err(ConfigError::InvalidEnvVar(k, _)) if k == key),
                "{key}={value} should be rejected"
            );
        }
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("STOREKEEP_PORT", "  "));
        assert_eq!(load(&vars).unwrap().port, 3000);
    }

    #[test]
    fn test_invalid_base_url() {
        let err = load(&[
            ("STOREKEEP_DATABASE_URL", "postgres://localhost/db"),
            ("STOREKEEP_BASE_URL", "not a url"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "STOREKEEP_BASE_URL"));
    }
}
