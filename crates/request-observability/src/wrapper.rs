//! Guaranteed-close trace and span lifecycle around asynchronous work.

use crate::propagation::PropagationContext;
use crate::tracer::{Metadata, SpanHandle, TraceHandle, Tracer};
use serde_json::Value;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

/// Composes a [`Tracer`] with request-derived base metadata.
///
/// One wrapper is built per request. Every trace it opens carries the base
/// metadata (deployment and invocation identifiers) merged with the
/// caller-supplied bag, caller keys winning on conflict.
///
/// The lifecycle contract for [`with_trace`](Self::with_trace) and
/// [`with_span`](Self::with_span): the trace/span is closed exactly once on
/// every exit path, the triggering error is attached as context before the
/// close, and the operation's result - success or failure - is returned to
/// the caller unchanged. The close also runs if the operation panics or its
/// future is dropped mid-await; only the process going away entirely can
/// skip it. This layer carries no deadline of its own.
#[derive(Clone)]
pub struct ObservabilityWrapper {
    tracer: Arc<dyn Tracer>,
    base_metadata: Metadata,
}

impl ObservabilityWrapper {
    /// Creates a wrapper around `tracer` with request-derived `base_metadata`.
    pub fn new(tracer: Arc<dyn Tracer>, base_metadata: Metadata) -> Self {
        Self {
            tracer,
            base_metadata,
        }
    }

    /// The underlying tracing backend.
    pub fn tracer(&self) -> &Arc<dyn Tracer> {
        &self.tracer
    }

    /// Runs `operation` inside a trace.
    ///
    /// Opens the trace with base ∪ `metadata` (caller keys win) and any
    /// inherited `propagation` identifiers, awaits the operation, and closes
    /// the trace exactly once whether the operation succeeds, fails or
    /// panics. On failure the error is attached to the trace context before
    /// the close and then re-surfaced unchanged.
    pub async fn with_trace<F, Fut, T, E>(
        &self,
        metadata: Metadata,
        propagation: PropagationContext,
        operation: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut merged = self.base_metadata.clone();
        merged.extend(metadata);

        let handle = self.tracer.start_trace(merged, propagation);
        let guard = CloseOnDrop {
            tracer: self.tracer.as_ref(),
            scope: Some(OpenScope::Trace(handle)),
        };
        let result = operation().await;

        if let Err(error) = &result {
            self.tracer.add_context(error_context(error));
        }
        drop(guard);

        result
    }

    /// Runs `operation` inside a span nested in whatever is currently open.
    ///
    /// Same close-exactly-once and error-annotation contract as
    /// [`with_trace`](Self::with_trace), scoped to the span. Spans nest
    /// arbitrarily deep; each call closes its own span on its own exit
    /// regardless of the outer trace's eventual outcome.
    pub async fn with_span<F, Fut, T, E>(&self, metadata: Metadata, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let handle = self.tracer.start_span(metadata);
        let guard = CloseOnDrop {
            tracer: self.tracer.as_ref(),
            scope: Some(OpenScope::Span(handle)),
        };
        let result = operation().await;

        if let Err(error) = &result {
            self.tracer.add_context(error_context(error));
        }
        drop(guard);

        result
    }

    /// Merges ad hoc fields into the currently open trace or span.
    ///
    /// For fields known only partway through an operation, such as a
    /// generated identifier. Never fails; with nothing open the collaborator
    /// decides what happens to the fields.
    pub fn add_context(&self, fields: Metadata) {
        self.tracer.add_context(fields);
    }

    /// Single-field convenience form of [`add_context`](Self::add_context).
    pub fn add_field(&self, key: impl Into<String>, value: impl Into<Value>) {
        let mut fields = Metadata::new();
        fields.insert(key.into(), value.into());
        self.tracer.add_context(fields);
    }
}

enum OpenScope {
    Trace(TraceHandle),
    Span(SpanHandle),
}

/// Closes the held scope when dropped, so a panic in the operation or a
/// mid-await drop of its future cannot skip the close.
struct CloseOnDrop<'a> {
    tracer: &'a dyn Tracer,
    scope: Option<OpenScope>,
}

impl Drop for CloseOnDrop<'_> {
    fn drop(&mut self) {
        match self.scope.take() {
            Some(OpenScope::Trace(handle)) => self.tracer.finish_trace(handle),
            Some(OpenScope::Span(handle)) => self.tracer.finish_span(handle),
            None => {}
        }
    }
}

fn error_context(error: &impl Display) -> Metadata {
    let mut fields = Metadata::new();
    fields.insert("error".to_string(), Value::String(error.to_string()));
    fields
}
