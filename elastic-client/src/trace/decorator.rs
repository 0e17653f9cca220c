//! Trace/log decorator applied around every outbound operation.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{error, info, Instrument, Span};

use crate::errors::ElasticError;
use crate::trace::tracer::{AttributeValue, OperationSpan, SpanStatus, Tracer, SPAN_NAME};
use crate::types::Operation;

/// Identifies one decorated call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Call<'a> {
    pub operation: Operation,
    pub index: &'a str,
    pub document_id: Option<&'a str>,
}

impl<'a> Call<'a> {
    pub fn new(operation: Operation, index: &'a str) -> Self {
        Self {
            operation,
            index,
            document_id: None,
        }
    }

    pub fn document(operation: Operation, index: &'a str, document_id: &'a str) -> Self {
        Self {
            operation,
            index,
            document_id: Some(document_id),
        }
    }

    fn attributes(&self) -> Vec<(&'static str, AttributeValue)> {
        let mut attributes = vec![
            ("db.system", AttributeValue::from("elasticsearch")),
            ("db.name", AttributeValue::from(self.index)),
            ("db.operation", AttributeValue::from(self.operation.as_str())),
        ];
        if let Some(id) = self.document_id {
            attributes.push(("db.document_id", AttributeValue::from(id)));
        }
        attributes
    }
}

/// Ends the wrapped span when dropped, so the span closes on success, error
/// and cancellation alike.
struct SpanGuard(Box<dyn OperationSpan>);

impl Drop for SpanGuard {
    fn drop(&mut self) {
        self.0.end();
    }
}

/// Run `work` with timing, structured logging and, when `tracer` is set, a span.
///
/// The result of `work` is returned unchanged.
pub(crate) async fn observe<T, F, Fut>(
    tracer: Option<&dyn Tracer>,
    call: Call<'_>,
    work: F,
) -> Result<T, ElasticError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ElasticError>>,
{
    let started = Instant::now();
    let mut guard = tracer.map(|t| SpanGuard(t.start_span(SPAN_NAME, call.attributes())));
    let span = guard
        .as_ref()
        .map(|g| g.0.context())
        .unwrap_or_else(Span::none);

    let result = work().instrument(span.clone()).await;
    let elapsed = started.elapsed();

    span.in_scope(|| match &result {
        Ok(_) => log_success(&call, elapsed),
        Err(e) => log_failure(&call, elapsed, e),
    });

    if let Some(SpanGuard(span)) = guard.as_mut() {
        match &result {
            Ok(_) => {
                span.set_status(SpanStatus::Ok);
                span.set_attribute("db.status", "success".into());
                span.set_attribute("db.duration_ms", (elapsed.as_millis() as f64).into());
            }
            Err(e) => {
                span.set_status(SpanStatus::Error(e.to_string()));
                span.record_error(e);
                span.set_attribute("db.status", "error".into());
                span.set_attribute("db.error", e.to_string().into());
            }
        }
    }

    result
}

fn log_success(call: &Call<'_>, elapsed: Duration) {
    info!(
        operation = call.operation.as_str(),
        index = call.index,
        document_id = call.document_id.unwrap_or_default(),
        duration = ?elapsed,
        "Elasticsearch operation success"
    );
}

fn log_failure(call: &Call<'_>, elapsed: Duration, err: &ElasticError) {
    error!(
        operation = call.operation.as_str(),
        index = call.index,
        document_id = call.document_id.unwrap_or_default(),
        duration = ?elapsed,
        error = %err,
        "Elasticsearch operation failed"
    );
}
