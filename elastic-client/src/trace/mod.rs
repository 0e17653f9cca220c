//! Tracing and logging around outbound operations.
//!
//! [`Tracer`] is the injected span collaborator; [`TracingTracer`] is the
//! default and maps spans onto the `tracing` crate. The decorator in
//! [`decorator`] is applied by the client to every request.

mod decorator;
mod tracer;

pub(crate) use decorator::{observe, Call};
pub use tracer::{AttributeValue, OperationSpan, SpanStatus, Tracer, TracingTracer, SPAN_NAME};
