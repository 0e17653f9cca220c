//! Error types for the Elasticsearch client wrapper.
//!
//! This module provides a unified error type for configuration, connection and
//! per-request failures.

mod elastic_error;

pub use elastic_error::ElasticError;
