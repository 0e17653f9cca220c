//! Elasticsearch client wrapper.
//!
//! Builds a connected client from [`Options`] or an environment-driven
//! [`Config`], and exposes document and index operations through the
//! [`SearchClient`] trait. Every operation is logged with its duration and,
//! when tracing is enabled, wrapped in an `elasticsearch.operation` span.

pub mod config;
pub mod elasticsearch;
pub mod errors;
pub mod interfaces;
pub mod options;
pub mod trace;
pub mod types;

pub use crate::config::Config;
pub use crate::elasticsearch::ElasticClient;
pub use crate::errors::ElasticError;
pub use crate::interfaces::SearchClient;
pub use crate::options::{Options, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT};
pub use crate::trace::{AttributeValue, OperationSpan, SpanStatus, Tracer, TracingTracer};
pub use crate::types::{Document, JsonMap, Operation};
