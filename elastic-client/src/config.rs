//! Declarative configuration for the Elasticsearch client.
//!
//! [`Config`] is meant to be embedded in an application's own configuration
//! file (any serde format) and can be overridden field by field from the
//! environment. Every field maps to `ELASTICSEARCH_<FIELD>`:
//!
//! | field | variable | default |
//! |-------|----------|---------|
//! | `enabled` | `ELASTICSEARCH_ENABLED` | `true` |
//! | `addresses` | `ELASTICSEARCH_ADDRESSES` (comma separated) | required |
//! | `username` | `ELASTICSEARCH_USERNAME` | |
//! | `password` | `ELASTICSEARCH_PASSWORD` | |
//! | `cloud_id` | `ELASTICSEARCH_CLOUD_ID` | |
//! | `api_key` | `ELASTICSEARCH_API_KEY` | |
//! | `enable_tls` | `ELASTICSEARCH_ENABLE_TLS` | `false` |
//! | `ca_cert` | `ELASTICSEARCH_CA_CERT` | |
//! | `dial_timeout` | `ELASTICSEARCH_DIAL_TIMEOUT` | `30s` |
//! | `read_timeout` | `ELASTICSEARCH_READ_TIMEOUT` | `30s` |
//! | `write_timeout` | `ELASTICSEARCH_WRITE_TIMEOUT` | `30s` |
//! | `max_retries` | `ELASTICSEARCH_MAX_RETRIES` | `3` |
//! | `enable_trace` | `ELASTICSEARCH_ENABLE_TRACE` | `true` |
//!
//! Durations use the humantime format (`500ms`, `5s`, `1m 30s`).

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ElasticError;
use crate::options::{validate_addresses, Options, DEFAULT_TIMEOUT};

/// Prefix shared by all environment overrides.
pub const ENV_PREFIX: &str = "ELASTICSEARCH";

/// Elasticsearch configuration block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub cloud_id: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub enable_tls: bool,
    #[serde(default)]
    pub ca_cert: Option<String>,
    #[serde(default, with = "humantime_opt")]
    pub dial_timeout: Option<Duration>,
    #[serde(default, with = "humantime_opt")]
    pub read_timeout: Option<Duration>,
    #[serde(default, with = "humantime_opt")]
    pub write_timeout: Option<Duration>,
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,
    #[serde(default = "default_enable_trace")]
    pub enable_trace: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_max_retries() -> i32 {
    3
}

fn default_enable_trace() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            addresses: Vec::new(),
            username: None,
            password: None,
            cloud_id: None,
            api_key: None,
            enable_tls: false,
            ca_cert: None,
            dial_timeout: None,
            read_timeout: None,
            write_timeout: None,
            max_retries: default_max_retries(),
            enable_trace: default_enable_trace(),
        }
    }
}

impl Config {
    /// Build a configuration from defaults plus `ELASTICSEARCH_*` variables.
    pub fn from_env() -> Result<Self, ElasticError> {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup, leaving fields untouched when the
    /// variable is absent.
    ///
    /// `from_env` passes `std::env::var`; tests pass a map.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ElasticError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |field: &str| lookup(&format!("{}_{}", ENV_PREFIX, field));

        if let Some(v) = get("ENABLED") {
            self.enabled = parse_bool("ENABLED", &v)?;
        }
        if let Some(v) = get("ADDRESSES") {
            self.addresses = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = get("USERNAME") {
            self.username = Some(v);
        }
        if let Some(v) = get("PASSWORD") {
            self.password = Some(v);
        }
        if let Some(v) = get("CLOUD_ID") {
            self.cloud_id = Some(v);
        }
        if let Some(v) = get("API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = get("ENABLE_TLS") {
            self.enable_tls = parse_bool("ENABLE_TLS", &v)?;
        }
        if let Some(v) = get("CA_CERT") {
            self.ca_cert = Some(v);
        }
        if let Some(v) = get("DIAL_TIMEOUT") {
            self.dial_timeout = Some(parse_duration("DIAL_TIMEOUT", &v)?);
        }
        if let Some(v) = get("READ_TIMEOUT") {
            self.read_timeout = Some(parse_duration("READ_TIMEOUT", &v)?);
        }
        if let Some(v) = get("WRITE_TIMEOUT") {
            self.write_timeout = Some(parse_duration("WRITE_TIMEOUT", &v)?);
        }
        if let Some(v) = get("MAX_RETRIES") {
            self.max_retries = v.trim().parse().map_err(|e| {
                ElasticError::config(format!("{}_MAX_RETRIES: {}", ENV_PREFIX, e))
            })?;
        }
        if let Some(v) = get("ENABLE_TRACE") {
            self.enable_trace = parse_bool("ENABLE_TRACE", &v)?;
        }
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// A disabled configuration is always valid.
    pub fn validate(&self) -> Result<(), ElasticError> {
        if !self.enabled {
            return Ok(());
        }
        validate_addresses(&self.addresses)
    }

    /// Convert into connection [`Options`].
    ///
    /// Fails when validation fails or when the feature is disabled. Unset or
    /// zero timeouts become [`DEFAULT_TIMEOUT`].
    pub fn to_options(&self) -> Result<Options, ElasticError> {
        self.validate()?;
        if !self.enabled {
            return Err(ElasticError::config("elasticsearch is not enabled"));
        }

        Ok(Options {
            addresses: self.addresses.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            cloud_id: self.cloud_id.clone(),
            api_key: self.api_key.clone(),
            enable_tls: self.enable_tls,
            ca_cert: self.ca_cert.clone(),
            dial_timeout: timeout_or_default(self.dial_timeout),
            read_timeout: timeout_or_default(self.read_timeout),
            write_timeout: timeout_or_default(self.write_timeout),
            max_retries: self.max_retries,
            enable_trace: self.enable_trace,
        })
    }

    /// Configured dial timeout, zero when unset.
    pub fn dial_timeout(&self) -> Duration {
        self.dial_timeout.unwrap_or_default()
    }

    /// Configured read timeout, zero when unset.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout.unwrap_or_default()
    }

    /// Configured write timeout, zero when unset.
    pub fn write_timeout(&self) -> Duration {
        self.write_timeout.unwrap_or_default()
    }
}

fn timeout_or_default(timeout: Option<Duration>) -> Duration {
    timeout
        .filter(|t| !t.is_zero())
        .unwrap_or(DEFAULT_TIMEOUT)
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ElasticError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ElasticError::config(format!(
            "{}_{}: invalid boolean '{}'",
            ENV_PREFIX, field, other
        ))),
    }
}

fn parse_duration(field: &str, value: &str) -> Result<Duration, ElasticError> {
    humantime::parse_duration(value.trim())
        .map_err(|e| ElasticError::config(format!("{}_{}: {}", ENV_PREFIX, field, e)))
}

/// Serde adapter for optional humantime durations.
mod humantime_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom))
            .transpose()
    }
}
