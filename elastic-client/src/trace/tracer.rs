//! Span collaborator abstraction and its `tracing` implementation.

use tracing::field::Empty;
use tracing::Span;

use crate::errors::ElasticError;

/// Name given to every operation span.
pub const SPAN_NAME: &str = "elasticsearch.operation";

/// Span attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Str(String),
    F64(f64),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

/// Final status of a span.
#[derive(Debug, Clone, PartialEq)]
pub enum SpanStatus {
    Ok,
    Error(String),
}

/// One started span. `end` is called exactly once by the decorator.
pub trait OperationSpan: Send {
    /// The `tracing` span the wrapped work runs in.
    fn context(&self) -> Span;

    fn set_attribute(&mut self, key: &'static str, value: AttributeValue);

    fn set_status(&mut self, status: SpanStatus);

    fn record_error(&mut self, error: &ElasticError);

    fn end(&mut self);
}

/// Creates spans for traced operations.
///
/// Injected into [`ElasticClient`](crate::ElasticClient) so tests and hosts
/// can substitute their own span sink.
pub trait Tracer: Send + Sync {
    fn start_span(
        &self,
        name: &'static str,
        attributes: Vec<(&'static str, AttributeValue)>,
    ) -> Box<dyn OperationSpan>;
}

/// Default tracer backed by `tracing` spans.
///
/// Span fields follow the OpenTelemetry database conventions (`db.*`) and the
/// `otel.status_code` / `otel.status_message` fields understood by
/// OpenTelemetry bridges.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTracer;

impl Tracer for TracingTracer {
    fn start_span(
        &self,
        name: &'static str,
        attributes: Vec<(&'static str, AttributeValue)>,
    ) -> Box<dyn OperationSpan> {
        let span = tracing::info_span!(
            "elasticsearch.operation",
            otel.name = name,
            otel.status_code = Empty,
            otel.status_message = Empty,
            db.system = Empty,
            db.name = Empty,
            db.operation = Empty,
            db.document_id = Empty,
            db.status = Empty,
            db.error = Empty,
            db.duration_ms = Empty,
            exception.message = Empty,
        );
        let mut traced = TracingSpan { span };
        for (key, value) in attributes {
            traced.set_attribute(key, value);
        }
        Box::new(traced)
    }
}

struct TracingSpan {
    span: Span,
}

impl OperationSpan for TracingSpan {
    fn context(&self) -> Span {
        self.span.clone()
    }

    fn set_attribute(&mut self, key: &'static str, value: AttributeValue) {
        match value {
            AttributeValue::Str(s) => {
                self.span.record(key, s.as_str());
            }
            AttributeValue::F64(f) => {
                self.span.record(key, f);
            }
        }
    }

    fn set_status(&mut self, status: SpanStatus) {
        match status {
            SpanStatus::Ok => {
                self.span.record("otel.status_code", "OK");
            }
            SpanStatus::Error(message) => {
                self.span.record("otel.status_code", "ERROR");
                self.span.record("otel.status_message", message.as_str());
            }
        }
    }

    fn record_error(&mut self, error: &ElasticError) {
        self.span
            .record("exception.message", tracing::field::display(error));
    }

    fn end(&mut self) {
        // closes once the last clone handed to the instrumented future is gone
        self.span = Span::none();
    }
}
