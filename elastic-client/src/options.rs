//! Connection options consumed by [`ElasticClient`](crate::ElasticClient).

use std::time::Duration;

use crate::errors::ElasticError;

/// Fallback used for every timeout that is unset or zero.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry count used when `max_retries` is not positive.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Connection parameters for an Elasticsearch cluster.
///
/// Usually produced by [`Config::to_options`](crate::Config::to_options), but
/// can be built directly:
///
/// ```
/// use std::time::Duration;
/// use elastic_client::Options;
///
/// let options = Options {
///     dial_timeout: Duration::from_secs(5),
///     ..Options::new(vec!["http://localhost:9200".to_string()])
/// };
/// assert_eq!(options.addresses.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    /// Endpoint URIs, e.g. `["http://localhost:9200"]`.
    pub addresses: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Elastic Cloud deployment id.
    pub cloud_id: Option<String>,
    /// API key, either `id:key` or the base64-encoded form.
    pub api_key: Option<String>,
    pub enable_tls: bool,
    /// Path to a PEM encoded CA certificate.
    pub ca_cert: Option<String>,
    pub dial_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub max_retries: i32,
    /// Open a tracing span around each operation.
    pub enable_trace: bool,
}

impl Options {
    /// Create options for the given addresses with every other field unset.
    pub fn new(addresses: Vec<String>) -> Self {
        Self {
            addresses,
            ..Default::default()
        }
    }

    /// Check the address invariant.
    pub fn validate(&self) -> Result<(), ElasticError> {
        validate_addresses(&self.addresses)
    }

    /// Dial timeout with the zero value replaced by [`DEFAULT_TIMEOUT`].
    pub fn effective_dial_timeout(&self) -> Duration {
        or_default(self.dial_timeout)
    }

    /// Transport-wide request timeout: the larger of the read and write timeouts.
    pub fn effective_request_timeout(&self) -> Duration {
        or_default(self.read_timeout).max(or_default(self.write_timeout))
    }

    /// Retry count handed to the transport, defaulting when not positive.
    pub fn effective_max_retries(&self) -> u32 {
        u32::try_from(self.max_retries)
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_RETRIES)
    }
}

/// Address list must be non-empty with no blank entries.
pub(crate) fn validate_addresses(addresses: &[String]) -> Result<(), ElasticError> {
    if addresses.is_empty() {
        return Err(ElasticError::config("elasticsearch addresses cannot be empty"));
    }
    for (i, addr) in addresses.iter().enumerate() {
        if addr.trim().is_empty() {
            return Err(ElasticError::config(format!(
                "elasticsearch addresses[{}] cannot be empty",
                i
            )));
        }
    }
    Ok(())
}

fn or_default(timeout: Duration) -> Duration {
    if timeout.is_zero() {
        DEFAULT_TIMEOUT
    } else {
        timeout
    }
}

/// Treat blank strings as absent.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
