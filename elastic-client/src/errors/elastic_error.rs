//! Elasticsearch error types.
//!
//! Every failure surfaced by the wrapper is one of these variants. Local
//! failures (configuration, serialization, decoding) are kept apart from
//! remote ones (transport, status) so callers can tell them apart.

use thiserror::Error;

use crate::types::Operation;

/// Unified errors from Elasticsearch client operations.
#[derive(Debug, Clone, Error)]
pub enum ElasticError {
    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Failed to build the client or reach the cluster at startup.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to serialize a request body.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The underlying transport failed before a response was received.
    #[error("failed to {}: {message}", operation.action())]
    TransportError {
        operation: Operation,
        message: String,
    },

    /// The server answered with an error-range status.
    #[error("elasticsearch {} error: [{status}] {body}", operation.name())]
    StatusError {
        operation: Operation,
        status: u16,
        body: String,
    },

    /// The server reported 404 for a document operation.
    #[error("document not found: index={index}, document_id={document_id}")]
    DocumentNotFound { index: String, document_id: String },

    /// Failed to decode a response body.
    #[error("failed to decode response: {0}")]
    DecodeError(String),

    /// The decoded response lacks an expected field or has the wrong shape.
    #[error("Invalid response: {0}")]
    InvalidResponseError(String),
}

impl ElasticError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Wrap a transport failure for the given operation.
    pub fn transport(operation: Operation, err: impl ToString) -> Self {
        Self::TransportError {
            operation,
            message: err.to_string(),
        }
    }

    /// Create a status error from a non-success response.
    pub fn status(operation: Operation, status: u16, body: impl Into<String>) -> Self {
        Self::StatusError {
            operation,
            status,
            body: body.into(),
        }
    }

    /// Create a document not found error.
    pub fn document_not_found(index: &str, document_id: &str) -> Self {
        Self::DocumentNotFound {
            index: index.to_string(),
            document_id: document_id.to_string(),
        }
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }

    /// Create an invalid response error.
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponseError(msg.into())
    }

    /// Whether this error is the 404 "document not found" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DocumentNotFound { .. })
    }

    /// HTTP status reported by the server, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::StatusError { status, .. } => Some(*status),
            Self::DocumentNotFound { .. } => Some(404),
            _ => None,
        }
    }
}
