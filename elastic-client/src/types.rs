//! Request payload and operation types shared by the client and the decorator.

use std::fmt;

use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use crate::errors::ElasticError;

/// Generic string-keyed JSON object used for queries, settings and decoded responses.
pub type JsonMap = Map<String, Value>;

/// Outbound operations issued against the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Index,
    Get,
    Delete,
    Search,
    Bulk,
    CreateIndex,
    DeleteIndex,
    ExistsIndex,
    Update,
    UpdateByQuery,
    Count,
    DeleteByQuery,
    Info,
    Ping,
}

impl Operation {
    /// Short name used in span attributes and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Get => "get",
            Self::Delete => "delete",
            Self::Search => "search",
            Self::Bulk => "bulk",
            Self::CreateIndex => "create_index",
            Self::DeleteIndex => "delete_index",
            Self::ExistsIndex => "exists_index",
            Self::Update => "update",
            Self::UpdateByQuery => "update_by_query",
            Self::Count => "count",
            Self::DeleteByQuery => "delete_by_query",
            Self::Info => "info",
            Self::Ping => "ping",
        }
    }

    /// Human readable name used in status error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Get => "get",
            Self::Delete => "delete",
            Self::Search => "search",
            Self::Bulk => "bulk",
            Self::CreateIndex => "create index",
            Self::DeleteIndex => "delete index",
            Self::ExistsIndex => "exists index",
            Self::Update => "update",
            Self::UpdateByQuery => "update by query",
            Self::Count => "count",
            Self::DeleteByQuery => "delete by query",
            Self::Info => "info",
            Self::Ping => "ping",
        }
    }

    /// Verb phrase used in transport error messages ("failed to ...").
    pub fn action(&self) -> &'static str {
        match self {
            Self::Index => "index document",
            Self::Get => "get document",
            Self::Delete => "delete document",
            Self::Search => "search",
            Self::Bulk => "bulk",
            Self::CreateIndex => "create index",
            Self::DeleteIndex => "delete index",
            Self::ExistsIndex => "check index",
            Self::Update => "update document",
            Self::UpdateByQuery => "update by query",
            Self::Count => "count",
            Self::DeleteByQuery => "delete by query",
            Self::Info => "connect to elasticsearch",
            Self::Ping => "ping elasticsearch",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document body in one of the three accepted shapes.
///
/// Raw text and raw bytes are sent verbatim and must already hold a JSON
/// document. Structured values are serialized by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Text(String),
    Bytes(Vec<u8>),
    Json(Value),
}

impl Document {
    /// Serialize any value into a structured document.
    ///
    /// Fails with [`ElasticError::SerializationError`] when the value has no JSON
    /// representation (for example a map with non-string keys).
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ElasticError> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(|e| ElasticError::serialization(format!("failed to marshal document: {}", e)))
    }

    /// Normalize the document into the exact JSON payload sent on the wire.
    pub(crate) fn into_payload(self) -> Result<Box<RawValue>, ElasticError> {
        let raw = match self {
            Self::Text(text) => RawValue::from_string(text),
            Self::Bytes(bytes) => {
                let text = String::from_utf8(bytes).map_err(|e| {
                    ElasticError::serialization(format!("document is not valid UTF-8: {}", e))
                })?;
                RawValue::from_string(text)
            }
            Self::Json(value) => serde_json::value::to_raw_value(&value),
        };
        raw.map_err(|e| ElasticError::serialization(format!("failed to marshal document: {}", e)))
    }
}

impl From<String> for Document {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Document {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for Document {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<JsonMap> for Document {
    fn from(map: JsonMap) -> Self {
        Self::Json(Value::Object(map))
    }
}
