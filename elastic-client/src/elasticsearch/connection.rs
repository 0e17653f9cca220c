//! Transport construction and the startup connectivity probe.

use std::fs;
use std::time::Duration;

use elasticsearch::auth::Credentials;
use elasticsearch::cert::{Certificate, CertificateValidation};
use elasticsearch::http::transport::{
    CloudConnectionPool, MultiNodeConnectionPool, SingleNodeConnectionPool, Transport,
    TransportBuilder,
};
use elasticsearch::http::Url;
use elasticsearch::Elasticsearch;
use tracing::{debug, warn};

use crate::elasticsearch::response;
use crate::errors::ElasticError;
use crate::options::{non_blank, Options};
use crate::types::Operation;

/// Which authentication the options resolve to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AuthMode {
    Basic { username: String, password: String },
    ApiKey { id: String, key: String },
    /// Already base64 encoded `id:key`, sent as is.
    EncodedApiKey(String),
    None,
}

/// Basic credentials win over an API key when both are configured.
pub(crate) fn auth_mode(options: &Options) -> AuthMode {
    if let (Some(username), Some(password)) =
        (non_blank(&options.username), non_blank(&options.password))
    {
        return AuthMode::Basic {
            username: username.to_string(),
            password: password.to_string(),
        };
    }

    match non_blank(&options.api_key) {
        Some(api_key) => match api_key.split_once(':') {
            Some((id, key)) if !id.is_empty() && !key.is_empty() => AuthMode::ApiKey {
                id: id.to_string(),
                key: key.to_string(),
            },
            _ => AuthMode::EncodedApiKey(api_key.to_string()),
        },
        None => AuthMode::None,
    }
}

fn parse_address(address: &str) -> Result<Url, ElasticError> {
    let address = address.trim();
    Url::parse(address)
        .map_err(|e| ElasticError::config(format!("invalid address '{}': {}", address, e)))
}

/// Number of endpoints the probe may try before giving up.
pub(crate) fn node_count(options: &Options) -> usize {
    if non_blank(&options.cloud_id).is_some() {
        1
    } else {
        options.addresses.len().max(1)
    }
}

/// Build the HTTP transport described by `options`.
///
/// A cloud id routes through the cloud connection pool. Otherwise a single
/// address uses a single-node pool and several addresses a round-robin pool.
pub(crate) fn build_transport(options: &Options) -> Result<Transport, ElasticError> {
    options.validate()?;

    let mut builder = match non_blank(&options.cloud_id) {
        Some(cloud_id) => {
            let pool = CloudConnectionPool::new(cloud_id)
                .map_err(|e| ElasticError::config(format!("invalid cloud id: {}", e)))?;
            TransportBuilder::new(pool)
        }
        None => {
            let mut urls = options
                .addresses
                .iter()
                .map(|a| parse_address(a))
                .collect::<Result<Vec<_>, _>>()?;
            if urls.len() == 1 {
                TransportBuilder::new(SingleNodeConnectionPool::new(urls.remove(0)))
            } else {
                TransportBuilder::new(MultiNodeConnectionPool::round_robin(urls, None))
            }
        }
    };

    builder = builder
        .disable_proxy()
        .timeout(options.effective_request_timeout());

    builder = match auth_mode(options) {
        AuthMode::Basic { username, password } => {
            builder.auth(Credentials::Basic(username, password))
        }
        AuthMode::ApiKey { id, key } => builder.auth(Credentials::ApiKey(id, key)),
        AuthMode::EncodedApiKey(encoded) => builder.auth(Credentials::EncodedApiKey(encoded)),
        AuthMode::None => builder,
    };

    if options.enable_tls {
        if let Some(path) = non_blank(&options.ca_cert) {
            let pem = fs::read(path).map_err(|e| {
                ElasticError::config(format!("failed to read CA certificate '{}': {}", path, e))
            })?;
            let certificate = Certificate::from_pem(&pem).map_err(|e| {
                ElasticError::config(format!("invalid CA certificate '{}': {}", path, e))
            })?;
            builder = builder.cert_validation(CertificateValidation::Full(certificate));
        }
    }

    builder.build().map_err(|e| {
        ElasticError::connection(format!("failed to create elasticsearch client: {}", e))
    })
}

/// Issue `GET /` and fail unless it succeeds, all within `deadline`.
///
/// Each attempt goes to the pool's next node, so with several addresses an
/// unreachable node is skipped. An error status is final.
pub(crate) async fn probe(
    client: &Elasticsearch,
    deadline: Duration,
    attempts: usize,
) -> Result<(), ElasticError> {
    tokio::time::timeout(deadline, probe_nodes(client, attempts))
        .await
        .map_err(|_| {
            ElasticError::connection(format!(
                "elasticsearch connectivity probe timed out after {:?}",
                deadline
            ))
        })?
}

async fn probe_nodes(client: &Elasticsearch, attempts: usize) -> Result<(), ElasticError> {
    let mut last_error = None;

    for attempt in 1..=attempts.max(1) {
        match client.info().send().await {
            Ok(response) => {
                response::ensure_success(Operation::Info, response)
                    .await
                    .map_err(|e| ElasticError::connection(e.to_string()))?;
                debug!(attempt, "Elasticsearch connectivity probe succeeded");
                return Ok(());
            }
            Err(e) => {
                warn!(attempt, error = %e, "Elasticsearch node unreachable");
                last_error = Some(e.to_string());
            }
        }
    }

    Err(ElasticError::connection(format!(
        "failed to connect to elasticsearch: {}",
        last_error.unwrap_or_default()
    )))
}
