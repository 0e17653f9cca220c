//! Response interpretation shared by all operations.

use elasticsearch::http::response::Response;
use serde_json::Value;

use crate::errors::ElasticError;
use crate::types::{JsonMap, Operation};

const NOT_FOUND: u16 = 404;

fn is_error(status: u16) -> bool {
    (400..600).contains(&status)
}

/// Turn an error-range response into [`ElasticError::StatusError`].
///
/// The body is read for the message, which also releases the connection.
pub(crate) async fn ensure_success(
    operation: Operation,
    response: Response,
) -> Result<Response, ElasticError> {
    let status = response.status_code().as_u16();
    if is_error(status) {
        let body = response.text().await.unwrap_or_default();
        return Err(ElasticError::status(operation, status, body));
    }
    Ok(response)
}

/// Like [`ensure_success`], but a 404 becomes [`ElasticError::DocumentNotFound`].
pub(crate) async fn ensure_document_found(
    operation: Operation,
    index: &str,
    document_id: &str,
    response: Response,
) -> Result<Response, ElasticError> {
    if response.status_code().as_u16() == NOT_FOUND {
        return Err(ElasticError::document_not_found(index, document_id));
    }
    ensure_success(operation, response).await
}

/// Map an existence check's status to a boolean.
pub(crate) async fn exists_from_status(
    operation: Operation,
    response: Response,
) -> Result<bool, ElasticError> {
    if response.status_code().as_u16() == NOT_FOUND {
        return Ok(false);
    }
    ensure_success(operation, response).await.map(|_| true)
}

/// Read the body and decode it as a JSON object.
pub(crate) async fn decode_map(
    operation: Operation,
    response: Response,
) -> Result<JsonMap, ElasticError> {
    let body = response
        .text()
        .await
        .map_err(|e| ElasticError::transport(operation, e))?;
    parse_map(&body)
}

pub(crate) fn parse_map(body: &str) -> Result<JsonMap, ElasticError> {
    serde_json::from_str(body).map_err(|e| ElasticError::decode(e.to_string()))
}

/// Extract the numeric `count` field of a count response.
pub(crate) fn extract_count(result: &JsonMap) -> Result<i64, ElasticError> {
    match result.get("count") {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| ElasticError::invalid_response("invalid count response format")),
        _ => Err(ElasticError::invalid_response("invalid count response format")),
    }
}
