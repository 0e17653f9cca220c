//! Elasticsearch client implementation.
//!
//! This module provides the concrete implementation of `SearchClient` on top
//! of the `elasticsearch` crate.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use elasticsearch::http::headers::HeaderMap;
use elasticsearch::http::request::JsonBody;
use elasticsearch::http::{Method, Url};
use elasticsearch::indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts};
use elasticsearch::params::Refresh;
use elasticsearch::{
    BulkParts, CountParts, DeleteByQueryParts, DeleteParts, Elasticsearch, GetParts, SearchParts,
    UpdateByQueryParts, UpdateParts,
};
use serde::Serialize;
use serde_json::value::RawValue;
use tracing::info;

use crate::elasticsearch::{connection, response};
use crate::errors::ElasticError;
use crate::interfaces::SearchClient;
use crate::options::Options;
use crate::trace::{observe, Call, Tracer, TracingTracer};
use crate::types::{Document, JsonMap, Operation};

/// Partial update envelope.
#[derive(Serialize)]
struct UpdateBody {
    doc: Box<RawValue>,
}

/// `/{index}/_doc/{id}` with each segment percent-encoded.
fn document_path(index: &str, document_id: &str) -> Result<String, ElasticError> {
    let mut url = Url::parse("http://localhost/")
        .map_err(|e| ElasticError::config(format!("failed to build document path: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| ElasticError::config("failed to build document path"))?
        .pop_if_empty()
        .extend([index, "_doc", document_id]);
    Ok(url.path().to_string())
}

#[derive(Serialize)]
struct UpdateByQueryBody<'a> {
    query: &'a JsonMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    script: Option<&'a JsonMap>,
}

/// Elasticsearch client with per-operation logging and optional tracing.
///
/// Construction probes the cluster and fails if it cannot be reached, so a
/// returned client has talked to the server at least once.
///
/// # Example
///
/// ```ignore
/// use elastic_client::{Config, Document, ElasticClient, SearchClient};
/// use serde_json::json;
///
/// let options = Config::from_env()?.to_options()?;
/// let client = ElasticClient::new(&options).await?;
///
/// client
///     .index("articles", "1", Document::from(json!({"title": "hello"})))
///     .await?;
/// let doc = client.get("articles", "1").await?;
/// ```
pub struct ElasticClient {
    client: Elasticsearch,
    enable_trace: bool,
    max_retries: u32,
    tracer: Arc<dyn Tracer>,
}

impl fmt::Debug for ElasticClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElasticClient")
            .field("enable_trace", &self.enable_trace)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl ElasticClient {
    /// Connect using the default `tracing`-backed tracer.
    pub async fn new(options: &Options) -> Result<Self, ElasticError> {
        Self::with_tracer(options, Arc::new(TracingTracer)).await
    }

    /// Connect using the given tracer for operation spans.
    ///
    /// # Returns
    ///
    /// * `Ok(ElasticClient)` - The cluster answered the probe with a success status
    /// * `Err(ElasticError::ConfigError)` - The options are invalid; nothing was sent
    /// * `Err(ElasticError::ConnectionError)` - The probe failed, timed out or got an error status
    pub async fn with_tracer(
        options: &Options,
        tracer: Arc<dyn Tracer>,
    ) -> Result<Self, ElasticError> {
        let transport = connection::build_transport(options)?;
        let client = Elasticsearch::new(transport);

        connection::probe(
            &client,
            options.effective_dial_timeout(),
            connection::node_count(options),
        )
        .await?;

        info!(
            addresses = ?options.addresses,
            cloud = options.cloud_id.is_some(),
            enable_trace = options.enable_trace,
            "Created Elasticsearch client"
        );

        Ok(Self {
            client,
            enable_trace: options.enable_trace,
            max_retries: options.effective_max_retries(),
            tracer,
        })
    }

    /// The native client, for requests this wrapper does not cover.
    pub fn inner(&self) -> &Elasticsearch {
        &self.client
    }

    pub fn enable_trace(&self) -> bool {
        self.enable_trace
    }

    /// Resolved retry budget from the options.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Connections belong to the transport pool; there is nothing to release.
    pub fn close(&self) -> Result<(), ElasticError> {
        Ok(())
    }

    fn tracer(&self) -> Option<&dyn Tracer> {
        self.enable_trace.then(|| self.tracer.as_ref())
    }

    async fn index_document(
        &self,
        index: &str,
        document_id: &str,
        document: Document,
    ) -> Result<(), ElasticError> {
        let op = Operation::Index;
        let payload = document.into_payload()?;
        let path = document_path(index, document_id)?;

        // the index builder always posts; an explicit id is a PUT
        let response = self
            .client
            .send(
                Method::Put,
                &path,
                HeaderMap::new(),
                Some(&[("refresh", "true")]),
                Some(JsonBody::new(payload)),
                None,
            )
            .await
            .map_err(|e| ElasticError::transport(op, e))?;

        response::ensure_success(op, response).await?;
        Ok(())
    }

    async fn get_document(&self, index: &str, document_id: &str) -> Result<JsonMap, ElasticError> {
        let op = Operation::Get;

        let response = self
            .client
            .get(GetParts::IndexId(index, document_id))
            .send()
            .await
            .map_err(|e| ElasticError::transport(op, e))?;

        let response = response::ensure_document_found(op, index, document_id, response).await?;
        response::decode_map(op, response).await
    }

    async fn delete_document(&self, index: &str, document_id: &str) -> Result<(), ElasticError> {
        let op = Operation::Delete;

        let response = self
            .client
            .delete(DeleteParts::IndexId(index, document_id))
            .refresh(Refresh::True)
            .send()
            .await
            .map_err(|e| ElasticError::transport(op, e))?;

        response::ensure_document_found(op, index, document_id, response).await?;
        Ok(())
    }

    async fn search_documents(&self, index: &str, query: &JsonMap) -> Result<JsonMap, ElasticError> {
        let op = Operation::Search;

        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(query)
            .send()
            .await
            .map_err(|e| ElasticError::transport(op, e))?;

        let response = response::ensure_success(op, response).await?;
        response::decode_map(op, response).await
    }

    async fn send_bulk(&self, body: &str) -> Result<(), ElasticError> {
        let op = Operation::Bulk;

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(vec![body.to_string()])
            .refresh(Refresh::True)
            .send()
            .await
            .map_err(|e| ElasticError::transport(op, e))?;

        response::ensure_success(op, response).await?;
        Ok(())
    }

    async fn create_index_with(&self, index: &str, settings: &JsonMap) -> Result<(), ElasticError> {
        let op = Operation::CreateIndex;

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(settings)
            .send()
            .await
            .map_err(|e| ElasticError::transport(op, e))?;

        response::ensure_success(op, response).await?;
        Ok(())
    }

    async fn delete_index_named(&self, index: &str) -> Result<(), ElasticError> {
        let op = Operation::DeleteIndex;

        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| ElasticError::transport(op, e))?;

        response::ensure_success(op, response).await?;
        Ok(())
    }

    async fn index_exists(&self, index: &str) -> Result<bool, ElasticError> {
        let op = Operation::ExistsIndex;

        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| ElasticError::transport(op, e))?;

        response::exists_from_status(op, response).await
    }

    async fn update_document(
        &self,
        index: &str,
        document_id: &str,
        document: Document,
    ) -> Result<(), ElasticError> {
        let op = Operation::Update;
        let body = UpdateBody {
            doc: document.into_payload()?,
        };

        let response = self
            .client
            .update(UpdateParts::IndexId(index, document_id))
            .body(body)
            .refresh(Refresh::True)
            .send()
            .await
            .map_err(|e| ElasticError::transport(op, e))?;

        response::ensure_document_found(op, index, document_id, response).await?;
        Ok(())
    }

    async fn update_matching(
        &self,
        index: &str,
        query: &JsonMap,
        script: Option<&JsonMap>,
    ) -> Result<JsonMap, ElasticError> {
        let op = Operation::UpdateByQuery;
        let body = UpdateByQueryBody { query, script };

        let response = self
            .client
            .update_by_query(UpdateByQueryParts::Index(&[index]))
            .body(body)
            .send()
            .await
            .map_err(|e| ElasticError::transport(op, e))?;

        let response = response::ensure_success(op, response).await?;
        response::decode_map(op, response).await
    }

    async fn count_documents(
        &self,
        index: &str,
        query: Option<&JsonMap>,
    ) -> Result<i64, ElasticError> {
        let op = Operation::Count;
        let indices = [index];

        let sent = match query {
            Some(query) => {
                self.client
                    .count(CountParts::Index(&indices))
                    .body(query)
                    .send()
                    .await
            }
            None => self.client.count(CountParts::Index(&indices)).send().await,
        };
        let response = sent.map_err(|e| ElasticError::transport(op, e))?;

        let response = response::ensure_success(op, response).await?;
        let result = response::decode_map(op, response).await?;
        response::extract_count(&result)
    }

    async fn delete_matching(&self, index: &str, query: &JsonMap) -> Result<JsonMap, ElasticError> {
        let op = Operation::DeleteByQuery;

        let response = self
            .client
            .delete_by_query(DeleteByQueryParts::Index(&[index]))
            .body(query)
            .send()
            .await
            .map_err(|e| ElasticError::transport(op, e))?;

        let response = response::ensure_success(op, response).await?;
        response::decode_map(op, response).await
    }

    async fn cluster_info(&self) -> Result<JsonMap, ElasticError> {
        let op = Operation::Info;

        let response = self
            .client
            .info()
            .send()
            .await
            .map_err(|e| ElasticError::transport(op, e))?;

        let response = response::ensure_success(op, response).await?;
        response::decode_map(op, response).await
    }

    async fn send_ping(&self) -> Result<(), ElasticError> {
        let op = Operation::Ping;

        let response = self
            .client
            .ping()
            .send()
            .await
            .map_err(|e| ElasticError::transport(op, e))?;

        response::ensure_success(op, response).await?;
        Ok(())
    }
}

#[async_trait]
impl SearchClient for ElasticClient {
    async fn index(
        &self,
        index: &str,
        document_id: &str,
        document: Document,
    ) -> Result<(), ElasticError> {
        let call = Call::document(Operation::Index, index, document_id);
        observe(self.tracer(), call, || {
            self.index_document(index, document_id, document)
        })
        .await
    }

    async fn get(&self, index: &str, document_id: &str) -> Result<JsonMap, ElasticError> {
        let call = Call::document(Operation::Get, index, document_id);
        observe(self.tracer(), call, || self.get_document(index, document_id)).await
    }

    async fn delete(&self, index: &str, document_id: &str) -> Result<(), ElasticError> {
        let call = Call::document(Operation::Delete, index, document_id);
        observe(self.tracer(), call, || self.delete_document(index, document_id)).await
    }

    async fn search(&self, index: &str, query: &JsonMap) -> Result<JsonMap, ElasticError> {
        let call = Call::new(Operation::Search, index);
        observe(self.tracer(), call, || self.search_documents(index, query)).await
    }

    async fn bulk(&self, body: &str) -> Result<(), ElasticError> {
        let call = Call::new(Operation::Bulk, "");
        observe(self.tracer(), call, || self.send_bulk(body)).await
    }

    async fn create_index(&self, index: &str, settings: &JsonMap) -> Result<(), ElasticError> {
        let call = Call::new(Operation::CreateIndex, index);
        observe(self.tracer(), call, || self.create_index_with(index, settings)).await
    }

    async fn delete_index(&self, index: &str) -> Result<(), ElasticError> {
        let call = Call::new(Operation::DeleteIndex, index);
        observe(self.tracer(), call, || self.delete_index_named(index)).await
    }

    async fn exists_index(&self, index: &str) -> Result<bool, ElasticError> {
        let call = Call::new(Operation::ExistsIndex, index);
        observe(self.tracer(), call, || self.index_exists(index)).await
    }

    async fn update(
        &self,
        index: &str,
        document_id: &str,
        document: Document,
    ) -> Result<(), ElasticError> {
        let call = Call::document(Operation::Update, index, document_id);
        observe(self.tracer(), call, || {
            self.update_document(index, document_id, document)
        })
        .await
    }

    async fn update_by_query(
        &self,
        index: &str,
        query: &JsonMap,
        script: Option<&JsonMap>,
    ) -> Result<JsonMap, ElasticError> {
        let call = Call::new(Operation::UpdateByQuery, index);
        observe(self.tracer(), call, || self.update_matching(index, query, script)).await
    }

    async fn count(&self, index: &str, query: Option<&JsonMap>) -> Result<i64, ElasticError> {
        let call = Call::new(Operation::Count, index);
        observe(self.tracer(), call, || self.count_documents(index, query)).await
    }

    async fn delete_by_query(
        &self,
        index: &str,
        query: &JsonMap,
    ) -> Result<JsonMap, ElasticError> {
        let call = Call::new(Operation::DeleteByQuery, index);
        observe(self.tracer(), call, || self.delete_matching(index, query)).await
    }

    async fn info(&self) -> Result<JsonMap, ElasticError> {
        let call = Call::new(Operation::Info, "");
        observe(self.tracer(), call, || self.cluster_info()).await
    }

    async fn ping(&self) -> Result<(), ElasticError> {
        let call = Call::new(Operation::Ping, "");
        observe(self.tracer(), call, || self.send_ping()).await
    }
}
