//! # Elastic Probe
//!
//! Startup health probe for an Elasticsearch cluster. Loads the client
//! configuration from the environment, connects (which runs the connectivity
//! probe) and reports what the cluster says about itself.
//!
//! ## Modules
//!
//! - [`report`]: Cluster report built from the info endpoint

pub mod report;

pub use report::{report, ProbeReport};

use elastic_client::ElasticError;
use thiserror::Error;

/// Errors that can occur while probing the cluster.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Configuration could not be loaded or converted.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The client failed to connect or a request failed.
    #[error("Client error: {0}")]
    ClientError(#[from] ElasticError),

    /// The cluster answered but the report could not be built.
    #[error("Report error: {0}")]
    ReportError(String),
}

impl ProbeError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a report error.
    pub fn report(msg: impl Into<String>) -> Self {
        Self::ReportError(msg.into())
    }
}
