//! Provider configuration.
//!
//! Credentials come from the provider block and fall back to the
//! `FIVETRAN_APIKEY` / `FIVETRAN_APISECRET` / `FIVETRAN_APIURL`
//! environment variables.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::FIVETRAN_API_BASE;
use crate::core::values::decode;
use crate::core::RetryPolicy;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

pub const ENV_API_KEY: &str = "FIVETRAN_APIKEY";
pub const ENV_API_SECRET: &str = "FIVETRAN_APISECRET";
pub const ENV_API_URL: &str = "FIVETRAN_APIURL";

pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Provider block as written by the user.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    api_key: Option<String>,
    api_secret: Option<String>,
    api_url: Option<String>,
    max_retries: Option<i64>,
}

/// Resolved provider configuration.
#[derive(Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub api_secret: String,
    pub api_url: String,
    pub max_retries: u32,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl ProviderConfig {
    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description(
                "Manages Fivetran groups, users, destinations, connections and schemas",
            )
            .with_attribute(
                "api_key",
                Attribute::optional_string()
                    .sensitive()
                    .with_description(format!("Fivetran API key. Falls back to {}.", ENV_API_KEY)),
            )
            .with_attribute(
                "api_secret",
                Attribute::optional_string()
                    .sensitive()
                    .with_description(format!(
                        "Fivetran API secret. Falls back to {}.",
                        ENV_API_SECRET
                    )),
            )
            .with_attribute(
                "api_url",
                Attribute::optional_string()
                    .with_description(format!(
                        "API base URL. Falls back to {}, then {}.",
                        ENV_API_URL, FIVETRAN_API_BASE
                    )),
            )
            .with_attribute(
                "max_retries",
                Attribute::optional_int64()
                    .with_description("Attempts for schema updates that hit a conflict")
                    .with_default(json!(DEFAULT_MAX_RETRIES)),
            )
    }

    /// Resolve the provider block against the process environment.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        Self::resolve(value, |name| std::env::var(name).ok())
    }

    /// Resolve the provider block with an explicit environment lookup.
    pub fn resolve<F>(value: Value, env: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = if value.is_null() {
            RawConfig::default()
        } else {
            decode(value)?
        };

        let pick = |configured: Option<String>, name: &str| {
            configured
                .filter(|v| !v.is_empty())
                .or_else(|| env(name).filter(|v| !v.is_empty()))
        };

        let api_key = pick(raw.api_key, ENV_API_KEY).ok_or_else(|| {
            ProviderError::Configuration(format!("api_key is required (or set {})", ENV_API_KEY))
        })?;
        let api_secret = pick(raw.api_secret, ENV_API_SECRET).ok_or_else(|| {
            ProviderError::Configuration(format!(
                "api_secret is required (or set {})",
                ENV_API_SECRET
            ))
        })?;
        let api_url =
            pick(raw.api_url, ENV_API_URL).unwrap_or_else(|| FIVETRAN_API_BASE.to_string());

        let max_retries = match raw.max_retries {
            None => DEFAULT_MAX_RETRIES,
            Some(n) if n >= 1 => u32::try_from(n).unwrap_or(u32::MAX),
            Some(n) => {
                return Err(ProviderError::Configuration(format!(
                    "max_retries must be at least 1, got {}",
                    n
                )))
            }
        };

        Ok(Self {
            api_key,
            api_secret,
            api_url,
            max_retries,
        })
    }

    /// Conflict retry policy; `delay` overrides the default back-off base.
    pub fn retry_policy(&self, delay: Option<Duration>) -> RetryPolicy {
        let policy = RetryPolicy::with_max_attempts(self.max_retries);
        match delay {
            Some(delay) => policy.with_delay(delay),
            None => policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_explicit_credentials() {
        let config = ProviderConfig::resolve(
            json!({"api_key": "key", "api_secret": "secret"}),
            no_env,
        )
        .unwrap();
        assert_eq!(config.api_key, "key");
        assert_eq!(config.api_url, "https://api.fivetran.com/v1");
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_env_fallback() {
        let env = |name: &str| match name {
            ENV_API_KEY => Some("env_key".to_string()),
            ENV_API_SECRET => Some("env_secret".to_string()),
            ENV_API_URL => Some("http://localhost:8080/v1".to_string()),
            _ => None,
        };
        let config = ProviderConfig::resolve(json!({"api_key": ""}), env).unwrap();
        assert_eq!(config.api_key, "env_key");
        assert_eq!(config.api_secret, "env_secret");
        assert_eq!(config.api_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_filled_defaults_leave_api_url_to_env() {
        let schema = ProviderConfig::schema();
        assert!(schema.attribute("api_url").is_some_and(|a| a.default.is_none()));

        let filled = crate::plan::plan(
            &schema,
            None,
            &json!({"api_key": "key", "api_secret": "secret"}),
        )
        .planned_state;
        let env =
            |name: &str| (name == ENV_API_URL).then(|| "http://localhost:8080/v1".to_string());
        let config = ProviderConfig::resolve(filled, env).unwrap();
        assert_eq!(config.api_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_missing_credentials() {
        let err = ProviderConfig::resolve(Value::Null, no_env).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(err.to_string().contains(ENV_API_KEY));
    }

    #[test]
    fn test_invalid_max_retries() {
        let err = ProviderConfig::resolve(
            json!({"api_key": "k", "api_secret": "s", "max_retries": 0}),
            no_env,
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_retries"));
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let config = ProviderConfig::resolve(
            json!({"api_key": "very_secret_key", "api_secret": "very_secret_secret"}),
            no_env,
        )
        .unwrap();
        let out = format!("{:?}", config);
        assert!(!out.contains("very_secret"));
    }
}
