//! Search client trait definition.
//!
//! This module defines the abstract interface for document and index
//! operations, so application code can depend on the trait and swap in a mock.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::ElasticError;
use crate::types::{Document, JsonMap};

/// Document and index operations against a search cluster.
///
/// Implemented by [`ElasticClient`](crate::ElasticClient). All methods return
/// `Result<T, ElasticError>`; a cancelled call is simply a dropped future.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Index a document under `document_id`, refreshing immediately.
    async fn index(
        &self,
        index: &str,
        document_id: &str,
        document: Document,
    ) -> Result<(), ElasticError>;

    /// Fetch a document.
    ///
    /// Returns [`ElasticError::DocumentNotFound`] when the server answers 404.
    async fn get(&self, index: &str, document_id: &str) -> Result<JsonMap, ElasticError>;

    /// Delete a document, refreshing immediately.
    ///
    /// Returns [`ElasticError::DocumentNotFound`] when the server answers 404.
    async fn delete(&self, index: &str, document_id: &str) -> Result<(), ElasticError>;

    /// Run a search request body against `index`.
    async fn search(&self, index: &str, query: &JsonMap) -> Result<JsonMap, ElasticError>;

    /// Send a newline-delimited bulk body, refreshing immediately.
    async fn bulk(&self, body: &str) -> Result<(), ElasticError>;

    /// Create an index with the given settings and mappings body.
    async fn create_index(&self, index: &str, settings: &JsonMap) -> Result<(), ElasticError>;

    async fn delete_index(&self, index: &str) -> Result<(), ElasticError>;

    /// `Ok(false)` on 404, `Ok(true)` on success, `Err` on any other error status.
    async fn exists_index(&self, index: &str) -> Result<bool, ElasticError>;

    /// Partially update a document. The body is wrapped as `{"doc": ...}`.
    async fn update(
        &self,
        index: &str,
        document_id: &str,
        document: Document,
    ) -> Result<(), ElasticError>;

    /// Update every document matching `query`, optionally running `script`.
    async fn update_by_query(
        &self,
        index: &str,
        query: &JsonMap,
        script: Option<&JsonMap>,
    ) -> Result<JsonMap, ElasticError>;

    /// Count documents, optionally restricted by a request body.
    async fn count(&self, index: &str, query: Option<&JsonMap>) -> Result<i64, ElasticError>;

    async fn delete_by_query(&self, index: &str, query: &JsonMap)
        -> Result<JsonMap, ElasticError>;

    /// Cluster information (`GET /`).
    async fn info(&self) -> Result<JsonMap, ElasticError>;

    async fn ping(&self) -> Result<(), ElasticError>;

    /// Ping with a five second deadline, reporting only reachability.
    async fn is_connected(&self) -> bool {
        matches!(
            tokio::time::timeout(Duration::from_secs(5), self.ping()).await,
            Ok(Ok(()))
        )
    }
}
