//! Elastic Probe Main Entry Point
//!
//! Connects to the Elasticsearch cluster described by `ELASTICSEARCH_*`
//! environment variables and exits non-zero if it cannot be reached.

use dotenv::dotenv;
use elastic_client::{Config, ElasticClient};
use elastic_probe::{report, ProbeError};
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("elastic_probe=info,elastic_client=info"));

    let json = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();
    }

    info!(
        service_name = "elastic-probe",
        service_version = env!("CARGO_PKG_VERSION"),
        json,
        "Tracing initialized"
    );
}

async fn run() -> Result<(), ProbeError> {
    let config = Config::from_env().map_err(|e| ProbeError::config(e.to_string()))?;
    let options = config
        .to_options()
        .map_err(|e| ProbeError::config(e.to_string()))?;

    let client = ElasticClient::new(&options).await?;
    report(&client).await?;
    client.close()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), ProbeError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing();

    info!("Starting Elasticsearch probe");

    match run().await {
        Ok(()) => {
            info!("Elasticsearch probe completed successfully");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Elasticsearch probe failed");
            Err(e)
        }
    }
}
