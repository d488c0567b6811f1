//! The tracing backend collaborator interface.

use serde_json::Value;
use std::time::{Duration, Instant};

/// A bag of named diagnostic fields attached to a trace or span.
pub type Metadata = serde_json::Map<String, Value>;

/// Builds a [`Metadata`] bag from a `json!` object literal.
///
/// Any non-object value yields an empty bag.
///
/// # Example
///
/// ```
/// use request_observability::metadata;
/// use serde_json::json;
///
/// let bag = metadata(json!({ "name": "fetch_record", "table": "records" }));
/// assert_eq!(bag.len(), 2);
/// ```
pub fn metadata(value: Value) -> Metadata {
    match value {
        Value::Object(map) => map,
        _ => Metadata::new(),
    }
}

/// Opaque handle to an open trace, returned by [`Tracer::start_trace`].
///
/// Must be passed back to [`Tracer::finish_trace`] exactly once.
#[derive(Debug)]
pub struct TraceHandle {
    trace_id: String,
    span_id: String,
    started_at: Instant,
}

impl TraceHandle {
    /// Creates a handle for a trace rooted at `span_id` within `trace_id`.
    pub fn new(trace_id: impl Into<String>, span_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            started_at: Instant::now(),
        }
    }

    /// The distributed trace identifier.
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// The identifier of the trace's root span.
    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    /// Time elapsed since the trace was opened.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Opaque handle to an open span, returned by [`Tracer::start_span`].
///
/// Must be passed back to [`Tracer::finish_span`] exactly once.
#[derive(Debug)]
pub struct SpanHandle {
    trace_id: String,
    span_id: String,
    started_at: Instant,
}

impl SpanHandle {
    /// Creates a handle for a span within `trace_id`.
    pub fn new(trace_id: impl Into<String>, span_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            started_at: Instant::now(),
        }
    }

    /// The distributed trace identifier this span belongs to.
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// The span's own identifier.
    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    /// Time elapsed since the span was opened.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// External tracing backend.
///
/// The backend owns the mutable "current context" bag: `add_context` merges
/// fields into whatever trace or span is currently open. If nothing is open
/// the backend decides what to do with the fields (the bundled
/// [`LoggingTracer`](crate::LoggingTracer) drops them); callers must not be
/// failed for it.
pub trait Tracer: Send + Sync {
    /// Opens a trace with the given metadata.
    ///
    /// When `propagation` carries inherited identifiers the trace continues
    /// the upstream caller's distributed trace instead of starting a new one.
    fn start_trace(
        &self,
        metadata: Metadata,
        propagation: crate::PropagationContext,
    ) -> TraceHandle;

    /// Closes a previously opened trace.
    fn finish_trace(&self, handle: TraceHandle);

    /// Opens a span nested in whatever trace or span is currently open.
    fn start_span(&self, metadata: Metadata) -> SpanHandle;

    /// Closes a previously opened span.
    fn finish_span(&self, handle: SpanHandle);

    /// Merges fields into the currently open trace or span context.
    fn add_context(&self, fields: Metadata);
}
