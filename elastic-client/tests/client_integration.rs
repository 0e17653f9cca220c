//! Integration tests for the Elasticsearch client.
//!
//! These tests run the real client against a local stub cluster built with
//! axum, so request shapes and status handling are checked without a live
//! Elasticsearch node.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::Span;

use elastic_client::{
    AttributeValue, Document, ElasticClient, ElasticError, JsonMap, OperationSpan, Options,
    SearchClient, SpanStatus, Tracer,
};

const INFO_BODY: &str = r#"{"name":"node-1","cluster_name":"stub","version":{"number":"8.15.0"},"tagline":"You Know, for Search"}"#;

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    query: String,
    body: String,
}

#[derive(Clone)]
struct Canned {
    status: StatusCode,
    body: String,
    delay: Option<Duration>,
    stall_body: bool,
}

#[derive(Clone, Default)]
struct StubState {
    routes: Arc<Mutex<HashMap<(Method, String), Canned>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

// Stub cluster answering `GET /` with cluster info and `{}` for anything unrouted
struct StubCluster {
    state: StubState,
    url: String,
}

impl StubCluster {
    async fn start() -> Self {
        let state = StubState::default();
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let stub = Self {
            state,
            url: format!("http://{}", addr),
        };
        stub.respond(Method::GET, "/", StatusCode::OK, INFO_BODY);
        stub
    }

    fn respond(&self, method: Method, path: &str, status: StatusCode, body: &str) {
        self.state.routes.lock().unwrap().insert(
            (method, path.to_string()),
            Canned {
                status,
                body: body.to_string(),
                delay: None,
                stall_body: false,
            },
        );
    }

    fn delay(&self, method: Method, path: &str, delay: Duration) {
        let mut routes = self.state.routes.lock().unwrap();
        if let Some(canned) = routes.get_mut(&(method, path.to_string())) {
            canned.delay = Some(delay);
        }
    }

    /// Send the routed body's first chunk, then never finish it.
    fn stall_body(&self, method: Method, path: &str) {
        let mut routes = self.state.routes.lock().unwrap();
        if let Some(canned) = routes.get_mut(&(method, path.to_string())) {
            canned.stall_body = true;
        }
    }

    fn options(&self) -> Options {
        Options::new(vec![self.url.clone()])
    }

    async fn client(&self) -> ElasticClient {
        ElasticClient::new(&self.options()).await.unwrap()
    }

    /// Requests received after the connectivity probe.
    fn requests(&self) -> Vec<Recorded> {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !(r.method == Method::GET && r.path == "/"))
            .cloned()
            .collect()
    }

    fn last_request(&self) -> Recorded {
        self.requests().pop().expect("no request recorded")
    }
}

async fn handle(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    body: String,
) -> Response {
    state.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().unwrap_or_default().to_string(),
        body,
    });

    let canned = state
        .routes
        .lock()
        .unwrap()
        .get(&(method, uri.path().to_string()))
        .cloned()
        .unwrap_or(Canned {
            status: StatusCode::OK,
            body: "{}".to_string(),
            delay: None,
            stall_body: false,
        });

    if let Some(delay) = canned.delay {
        tokio::time::sleep(delay).await;
    }

    let headers = [
        ("content-type", "application/json"),
        ("x-elastic-product", "Elasticsearch"),
    ];

    if canned.stall_body {
        let chunks = stream::once(async move { Ok::<_, Infallible>(canned.body) })
            .chain(stream::pending());
        return (canned.status, headers, Body::from_stream(chunks)).into_response();
    }

    (canned.status, headers, canned.body).into_response()
}

fn map(value: Value) -> JsonMap {
    match value {
        Value::Object(m) => m,
        other => panic!("expected object, got {}", other),
    }
}

fn body_json(request: &Recorded) -> Value {
    serde_json::from_str(&request.body).unwrap()
}

// Tracer that records span lifecycles for assertions
#[derive(Default)]
struct RecordingTracer {
    spans: Arc<Mutex<Vec<Arc<Mutex<SpanRecord>>>>>,
}

#[derive(Debug, Default)]
struct SpanRecord {
    attributes: Vec<(&'static str, AttributeValue)>,
    statuses: Vec<SpanStatus>,
    ends: usize,
}

struct RecordingSpan(Arc<Mutex<SpanRecord>>);

impl OperationSpan for RecordingSpan {
    fn context(&self) -> Span {
        Span::none()
    }

    fn set_attribute(&mut self, key: &'static str, value: AttributeValue) {
        self.0.lock().unwrap().attributes.push((key, value));
    }

    fn set_status(&mut self, status: SpanStatus) {
        self.0.lock().unwrap().statuses.push(status);
    }

    fn record_error(&mut self, _error: &ElasticError) {}

    fn end(&mut self) {
        self.0.lock().unwrap().ends += 1;
    }
}

impl Tracer for RecordingTracer {
    fn start_span(
        &self,
        _name: &'static str,
        attributes: Vec<(&'static str, AttributeValue)>,
    ) -> Box<dyn OperationSpan> {
        let record = Arc::new(Mutex::new(SpanRecord {
            attributes,
            ..Default::default()
        }));
        self.spans.lock().unwrap().push(record.clone());
        Box::new(RecordingSpan(record))
    }
}

impl SpanRecord {
    fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

// ---- construction ----

#[tokio::test]
async fn test_new_probes_cluster() {
    let stub = StubCluster::start().await;
    let client = stub.client().await;

    let probes = stub.state.requests.lock().unwrap().clone();
    assert_eq!(probes.len(), 1);
    assert_eq!(probes[0].method, Method::GET);
    assert_eq!(probes[0].path, "/");

    assert!(!client.enable_trace());
    assert_eq!(client.max_retries(), 3);
    assert!(client.close().is_ok());
}

#[tokio::test]
async fn test_new_fails_when_probe_returns_error_status() {
    let stub = StubCluster::start().await;
    stub.respond(Method::GET, "/", StatusCode::INTERNAL_SERVER_ERROR, "down");

    let err = ElasticClient::new(&stub.options()).await.unwrap_err();
    assert!(matches!(err, ElasticError::ConnectionError(_)));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_new_rejects_empty_addresses_without_network() {
    let err = ElasticClient::new(&Options::new(vec![])).await.unwrap_err();
    assert!(matches!(err, ElasticError::ConfigError(_)));
    assert!(err.to_string().contains("addresses cannot be empty"));
}

#[tokio::test]
async fn test_new_fails_for_unreachable_address() {
    let options = Options {
        dial_timeout: Duration::from_secs(2),
        ..Options::new(vec!["http://127.0.0.1:1".to_string()])
    };
    let err = ElasticClient::new(&options).await.unwrap_err();
    assert!(matches!(err, ElasticError::ConnectionError(_)));
}

#[tokio::test]
async fn test_new_times_out_on_slow_probe() {
    let stub = StubCluster::start().await;
    stub.delay(Method::GET, "/", Duration::from_secs(5));

    let options = Options {
        dial_timeout: Duration::from_millis(200),
        ..stub.options()
    };
    let err = ElasticClient::new(&options).await.unwrap_err();
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn test_new_deadline_covers_error_body() {
    let stub = StubCluster::start().await;
    stub.respond(Method::GET, "/", StatusCode::INTERNAL_SERVER_ERROR, "partial");
    stub.stall_body(Method::GET, "/");

    let options = Options {
        dial_timeout: Duration::from_millis(300),
        ..stub.options()
    };
    let started = std::time::Instant::now();
    let err = ElasticClient::new(&options).await.unwrap_err();

    assert!(err.to_string().contains("timed out"));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_new_skips_unreachable_address() {
    let stub = StubCluster::start().await;
    let options = Options::new(vec!["http://127.0.0.1:1".to_string(), stub.url.clone()]);

    let client = ElasticClient::new(&options).await.unwrap();

    let probes = stub.state.requests.lock().unwrap().clone();
    assert_eq!(probes.len(), 1);
    assert_eq!(probes[0].path, "/");
    assert!(client.close().is_ok());
}

#[tokio::test]
async fn test_requests_spread_across_addresses() {
    let first = StubCluster::start().await;
    let second = StubCluster::start().await;
    let options = Options::new(vec![first.url.clone(), second.url.clone()]);

    let client = ElasticClient::new(&options).await.unwrap();
    for _ in 0..4 {
        client.ping().await.unwrap();
    }

    assert!(!first.requests().is_empty());
    assert!(!second.requests().is_empty());
    assert_eq!(first.requests().len() + second.requests().len(), 4);
}

#[tokio::test]
async fn test_all_addresses_unreachable() {
    let options = Options {
        dial_timeout: Duration::from_secs(2),
        ..Options::new(vec![
            "http://127.0.0.1:1".to_string(),
            "http://127.0.0.1:2".to_string(),
        ])
    };
    let err = ElasticClient::new(&options).await.unwrap_err();
    assert!(matches!(err, ElasticError::ConnectionError(_)));
    assert!(err.to_string().contains("failed to connect"));
}

#[tokio::test]
async fn test_non_positive_max_retries_resolves_to_default() {
    let stub = StubCluster::start().await;
    let options = Options {
        max_retries: -1,
        ..stub.options()
    };
    let client = ElasticClient::new(&options).await.unwrap();
    assert_eq!(client.max_retries(), 3);
}

// ---- documents ----

#[tokio::test]
async fn test_index_document_shapes_send_equivalent_json() {
    let stub = StubCluster::start().await;
    let client = stub.client().await;
    let expected = json!({"title": "hello", "views": 3});

    let documents = vec![
        Document::from(r#"{"title":"hello","views":3}"#),
        Document::from(br#"{"title":"hello","views":3}"#.to_vec()),
        Document::from(expected.clone()),
    ];

    for document in documents {
        client.index("articles", "1", document).await.unwrap();

        let request = stub.last_request();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.path, "/articles/_doc/1");
        assert!(request.query.contains("refresh=true"));
        assert_eq!(body_json(&request), expected);
    }
}

#[tokio::test]
async fn test_index_rejects_invalid_raw_json_before_sending() {
    let stub = StubCluster::start().await;
    let client = stub.client().await;

    let err = client
        .index("articles", "1", Document::from("not json"))
        .await
        .unwrap_err();
    assert!(matches!(err, ElasticError::SerializationError(_)));
    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn test_index_error_status_includes_operation_and_body() {
    let stub = StubCluster::start().await;
    stub.respond(
        Method::PUT,
        "/articles/_doc/1",
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"error":"shard failure"}"#,
    );
    let client = stub.client().await;

    let err = client
        .index("articles", "1", Document::from(json!({"a": 1})))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(500));
    let message = err.to_string();
    assert!(message.contains("index"));
    assert!(message.contains("shard failure"));
}

#[tokio::test]
async fn test_get_returns_document() {
    let stub = StubCluster::start().await;
    stub.respond(
        Method::GET,
        "/articles/_doc/1",
        StatusCode::OK,
        r#"{"_index":"articles","_id":"1","found":true,"_source":{"title":"hello"}}"#,
    );
    let client = stub.client().await;

    let doc = client.get("articles", "1").await.unwrap();
    assert_eq!(doc["_id"], "1");
    assert_eq!(doc["_source"]["title"], "hello");
}

#[tokio::test]
async fn test_missing_document_is_not_found() {
    let stub = StubCluster::start().await;
    let not_found = r#"{"_index":"articles","_id":"404","found":false}"#;
    stub.respond(Method::GET, "/articles/_doc/404", StatusCode::NOT_FOUND, not_found);
    stub.respond(Method::DELETE, "/articles/_doc/404", StatusCode::NOT_FOUND, not_found);
    stub.respond(Method::POST, "/articles/_update/404", StatusCode::NOT_FOUND, not_found);
    let client = stub.client().await;

    let err = client.get("articles", "404").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        err.to_string(),
        "document not found: index=articles, document_id=404"
    );

    assert!(client.delete("articles", "404").await.unwrap_err().is_not_found());
    assert!(client
        .update("articles", "404", Document::from(json!({"a": 1})))
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_get_malformed_body_is_decode_error() {
    let stub = StubCluster::start().await;
    stub.respond(Method::GET, "/articles/_doc/1", StatusCode::OK, "{not json");
    let client = stub.client().await;

    let err = client.get("articles", "1").await.unwrap_err();
    assert!(matches!(err, ElasticError::DecodeError(_)));
}

#[tokio::test]
async fn test_delete_forces_refresh() {
    let stub = StubCluster::start().await;
    let client = stub.client().await;

    client.delete("articles", "1").await.unwrap();

    let request = stub.last_request();
    assert_eq!(request.method, Method::DELETE);
    assert_eq!(request.path, "/articles/_doc/1");
    assert!(request.query.contains("refresh=true"));
}

#[tokio::test]
async fn test_update_document_shapes_send_equivalent_envelope() {
    let stub = StubCluster::start().await;
    let client = stub.client().await;

    let documents = vec![
        Document::from(r#"{"views":4}"#),
        Document::from(br#"{"views":4}"#.to_vec()),
        Document::from(json!({"views": 4})),
    ];

    for document in documents {
        client.update("articles", "1", document).await.unwrap();

        let request = stub.last_request();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/articles/_update/1");
        assert!(request.query.contains("refresh=true"));
        assert_eq!(body_json(&request), json!({"doc": {"views": 4}}));
    }
}

// ---- queries ----

#[tokio::test]
async fn test_search_sends_query_and_decodes_result() {
    let stub = StubCluster::start().await;
    stub.respond(
        Method::POST,
        "/articles/_search",
        StatusCode::OK,
        r#"{"hits":{"total":{"value":1},"hits":[{"_id":"1"}]}}"#,
    );
    let client = stub.client().await;

    let query = map(json!({"query": {"match": {"title": "hello"}}}));
    let result = client.search("articles", &query).await.unwrap();
    assert_eq!(result["hits"]["total"]["value"], 1);

    let request = stub.last_request();
    assert_eq!(body_json(&request), Value::Object(query));
}

#[tokio::test]
async fn test_search_error_status() {
    let stub = StubCluster::start().await;
    stub.respond(
        Method::POST,
        "/articles/_search",
        StatusCode::BAD_REQUEST,
        r#"{"error":"parsing_exception"}"#,
    );
    let client = stub.client().await;

    let err = client
        .search("articles", &map(json!({"query": {}})))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(400));
    assert!(err.to_string().contains("parsing_exception"));
}

#[tokio::test]
async fn test_count_with_and_without_query() {
    let stub = StubCluster::start().await;
    stub.respond(Method::POST, "/articles/_count", StatusCode::OK, r#"{"count":42}"#);
    stub.respond(Method::GET, "/articles/_count", StatusCode::OK, r#"{"count":42}"#);
    let client = stub.client().await;

    let query = map(json!({"query": {"term": {"status": "draft"}}}));
    assert_eq!(client.count("articles", Some(&query)).await.unwrap(), 42);
    assert_eq!(body_json(&stub.last_request()), Value::Object(query));

    assert_eq!(client.count("articles", None).await.unwrap(), 42);
    assert!(stub.last_request().body.is_empty());
}

#[tokio::test]
async fn test_count_missing_field_is_invalid_response() {
    let stub = StubCluster::start().await;
    stub.respond(Method::GET, "/articles/_count", StatusCode::OK, r#"{"total":1}"#);
    let client = stub.client().await;

    let err = client.count("articles", None).await.unwrap_err();
    assert!(matches!(err, ElasticError::InvalidResponseError(_)));
    assert!(err.to_string().contains("invalid count response format"));
}

#[tokio::test]
async fn test_update_by_query_with_and_without_script() {
    let stub = StubCluster::start().await;
    stub.respond(
        Method::POST,
        "/articles/_update_by_query",
        StatusCode::OK,
        r#"{"updated":2}"#,
    );
    let client = stub.client().await;

    let query = map(json!({"term": {"status": "draft"}}));
    let script = map(json!({"source": "ctx._source.views = 0"}));

    let result = client
        .update_by_query("articles", &query, Some(&script))
        .await
        .unwrap();
    assert_eq!(result["updated"], 2);
    assert_eq!(
        body_json(&stub.last_request()),
        json!({"query": {"term": {"status": "draft"}}, "script": {"source": "ctx._source.views = 0"}})
    );

    client
        .update_by_query("articles", &query, None)
        .await
        .unwrap();
    assert_eq!(
        body_json(&stub.last_request()),
        json!({"query": {"term": {"status": "draft"}}})
    );
}

#[tokio::test]
async fn test_delete_by_query() {
    let stub = StubCluster::start().await;
    stub.respond(
        Method::POST,
        "/articles/_delete_by_query",
        StatusCode::OK,
        r#"{"deleted":5}"#,
    );
    let client = stub.client().await;

    let query = map(json!({"query": {"match_all": {}}}));
    let result = client.delete_by_query("articles", &query).await.unwrap();
    assert_eq!(result["deleted"], 5);
    assert_eq!(body_json(&stub.last_request()), Value::Object(query));
}

#[tokio::test]
async fn test_bulk_sends_body_with_refresh() {
    let stub = StubCluster::start().await;
    let client = stub.client().await;

    let body = "{\"index\":{\"_index\":\"articles\",\"_id\":\"1\"}}\n{\"title\":\"a\"}\n";
    client.bulk(body).await.unwrap();

    let request = stub.last_request();
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path, "/_bulk");
    assert!(request.query.contains("refresh=true"));
    assert!(request.body.starts_with(body));
}

#[tokio::test]
async fn test_bulk_error_status() {
    let stub = StubCluster::start().await;
    stub.respond(Method::POST, "/_bulk", StatusCode::BAD_REQUEST, "bad bulk");
    let client = stub.client().await;

    let err = client.bulk("{}\n").await.unwrap_err();
    assert_eq!(err.status_code(), Some(400));
}

// ---- indices ----

#[tokio::test]
async fn test_create_and_delete_index() {
    let stub = StubCluster::start().await;
    let client = stub.client().await;

    let settings = map(json!({"settings": {"number_of_shards": 1}}));
    client.create_index("articles", &settings).await.unwrap();
    let request = stub.last_request();
    assert_eq!(request.method, Method::PUT);
    assert_eq!(request.path, "/articles");
    assert_eq!(body_json(&request), Value::Object(settings));

    client.delete_index("articles").await.unwrap();
    let request = stub.last_request();
    assert_eq!(request.method, Method::DELETE);
    assert_eq!(request.path, "/articles");
}

#[tokio::test]
async fn test_create_index_conflict() {
    let stub = StubCluster::start().await;
    stub.respond(
        Method::PUT,
        "/articles",
        StatusCode::BAD_REQUEST,
        r#"{"error":"resource_already_exists_exception"}"#,
    );
    let client = stub.client().await;

    let err = client
        .create_index("articles", &JsonMap::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("resource_already_exists_exception"));
}

#[tokio::test]
async fn test_exists_index() {
    let stub = StubCluster::start().await;
    stub.respond(Method::HEAD, "/present", StatusCode::OK, "");
    stub.respond(Method::HEAD, "/absent", StatusCode::NOT_FOUND, "");
    stub.respond(Method::HEAD, "/broken", StatusCode::INTERNAL_SERVER_ERROR, "");
    let client = stub.client().await;

    assert!(client.exists_index("present").await.unwrap());
    assert!(!client.exists_index("absent").await.unwrap());
    let err = client.exists_index("broken").await.unwrap_err();
    assert_eq!(err.status_code(), Some(500));
}

// ---- cluster ----

#[tokio::test]
async fn test_info_ping_and_is_connected() {
    let stub = StubCluster::start().await;
    let client = stub.client().await;

    let info = client.info().await.unwrap();
    assert_eq!(info["cluster_name"], "stub");

    client.ping().await.unwrap();
    assert_eq!(stub.last_request().method, Method::HEAD);
    assert!(client.is_connected().await);

    stub.respond(Method::HEAD, "/", StatusCode::SERVICE_UNAVAILABLE, "");
    assert!(client.ping().await.is_err());
    assert!(!client.is_connected().await);
}

// ---- tracing ----

#[tokio::test]
async fn test_tracing_does_not_change_results() {
    let stub = StubCluster::start().await;
    stub.respond(Method::GET, "/articles/_doc/1", StatusCode::OK, r#"{"_id":"1"}"#);
    stub.respond(Method::GET, "/articles/_doc/2", StatusCode::NOT_FOUND, "{}");

    let plain = stub.client().await;
    let tracer = Arc::new(RecordingTracer::default());
    let traced_options = Options {
        enable_trace: true,
        ..stub.options()
    };
    let traced = ElasticClient::with_tracer(&traced_options, tracer.clone())
        .await
        .unwrap();
    assert!(traced.enable_trace());

    assert_eq!(
        plain.get("articles", "1").await.unwrap(),
        traced.get("articles", "1").await.unwrap()
    );
    assert_eq!(
        plain.get("articles", "2").await.unwrap_err().to_string(),
        traced.get("articles", "2").await.unwrap_err().to_string()
    );

    let spans = tracer.spans.lock().unwrap();
    assert_eq!(spans.len(), 2);

    let ok = spans[0].lock().unwrap();
    assert_eq!(ok.ends, 1);
    assert_eq!(ok.statuses, vec![SpanStatus::Ok]);
    assert_eq!(ok.attribute("db.operation"), Some(&AttributeValue::from("get")));
    assert_eq!(ok.attribute("db.document_id"), Some(&AttributeValue::from("1")));

    let failed = spans[1].lock().unwrap();
    assert_eq!(failed.ends, 1);
    assert!(matches!(failed.statuses.as_slice(), [SpanStatus::Error(_)]));
    assert_eq!(failed.attribute("db.status"), Some(&AttributeValue::from("error")));
}

#[tokio::test]
async fn test_disabled_tracing_starts_no_spans() {
    let stub = StubCluster::start().await;
    let tracer = Arc::new(RecordingTracer::default());
    let client = ElasticClient::with_tracer(&stub.options(), tracer.clone())
        .await
        .unwrap();

    client.ping().await.unwrap();
    client.count("articles", None).await.ok();

    assert!(tracer.spans.lock().unwrap().is_empty());
}
