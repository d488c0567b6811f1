//! A [`Tracer`] implementation backed by structured `tracing` events.
//!
//! Each trace and span becomes a pair of events under the `trace_lifecycle`
//! target, carrying W3C-shaped identifiers and the accumulated metadata bag.
//! Where the events go (stdout, a collector, a log pipeline) is the
//! subscriber's concern; this type only upholds the lifecycle contract.

use crate::propagation::PropagationContext;
use crate::tracer::{Metadata, SpanHandle, TraceHandle, Tracer};
use std::sync::Mutex;

/// Tracing backend that emits structured lifecycle events.
///
/// Maintains the shared current-scope stack: `start_trace`/`start_span` push
/// a scope, the matching finish removes it *by identifier* rather than
/// popping, so concurrently in-flight sibling spans can each close their own
/// scope without corrupting the nesting. `add_context` merges into the most
/// recently opened scope still alive; with nothing open the fields are
/// dropped.
#[derive(Debug, Default)]
pub struct LoggingTracer {
    scopes: Mutex<Vec<Scope>>,
}

#[derive(Debug)]
struct Scope {
    trace_id: String,
    span_id: String,
    metadata: Metadata,
}

impl LoggingTracer {
    /// Creates a tracer with an empty scope stack.
    pub fn new() -> Self {
        Self::default()
    }

    fn push_scope(&self, trace_id: String, span_id: String, metadata: Metadata) {
        self.scopes.lock().expect("scope stack poisoned").push(Scope {
            trace_id,
            span_id,
            metadata,
        });
    }

    fn remove_scope(&self, span_id: &str) -> Option<Scope> {
        let mut scopes = self.scopes.lock().expect("scope stack poisoned");
        let index = scopes.iter().rposition(|scope| scope.span_id == span_id)?;
        Some(scopes.remove(index))
    }

    fn current_parent(&self) -> Option<(String, String)> {
        let scopes = self.scopes.lock().expect("scope stack poisoned");
        scopes
            .last()
            .map(|scope| (scope.trace_id.clone(), scope.span_id.clone()))
    }
}

impl Tracer for LoggingTracer {
    fn start_trace(&self, metadata: Metadata, propagation: PropagationContext) -> TraceHandle {
        let trace_id = propagation.trace_id.unwrap_or_else(generate_trace_id);
        let span_id = generate_span_id();

        tracing::info!(
            target: "trace_lifecycle",
            trace_id = %trace_id,
            span_id = %span_id,
            parent_span_id = propagation.parent_span_id.as_deref().unwrap_or(""),
            metadata = %serde_json::Value::Object(metadata.clone()),
            "trace started"
        );

        self.push_scope(trace_id.clone(), span_id.clone(), metadata);
        TraceHandle::new(trace_id, span_id)
    }

    fn finish_trace(&self, handle: TraceHandle) {
        let Some(scope) = self.remove_scope(handle.span_id()) else {
            tracing::warn!(
                target: "trace_lifecycle",
                trace_id = %handle.trace_id(),
                span_id = %handle.span_id(),
                "finish_trace for an unknown scope"
            );
            return;
        };

        tracing::info!(
            target: "trace_lifecycle",
            trace_id = %scope.trace_id,
            span_id = %scope.span_id,
            duration_ms = handle.elapsed().as_millis() as u64,
            metadata = %serde_json::Value::Object(scope.metadata),
            "trace finished"
        );
    }

    fn start_span(&self, metadata: Metadata) -> SpanHandle {
        let (trace_id, parent_span_id) = match self.current_parent() {
            Some((trace_id, parent)) => (trace_id, Some(parent)),
            None => (generate_trace_id(), None),
        };
        let span_id = generate_span_id();

        tracing::info!(
            target: "trace_lifecycle",
            trace_id = %trace_id,
            span_id = %span_id,
            parent_span_id = parent_span_id.as_deref().unwrap_or(""),
            metadata = %serde_json::Value::Object(metadata.clone()),
            "span started"
        );

        self.push_scope(trace_id.clone(), span_id.clone(), metadata);
        SpanHandle::new(trace_id, span_id)
    }

    fn finish_span(&self, handle: SpanHandle) {
        let Some(scope) = self.remove_scope(handle.span_id()) else {
            tracing::warn!(
                target: "trace_lifecycle",
                trace_id = %handle.trace_id(),
                span_id = %handle.span_id(),
                "finish_span for an unknown scope"
            );
            return;
        };

        tracing::info!(
            target: "trace_lifecycle",
            trace_id = %scope.trace_id,
            span_id = %scope.span_id,
            duration_ms = handle.elapsed().as_millis() as u64,
            metadata = %serde_json::Value::Object(scope.metadata),
            "span finished"
        );
    }

    fn add_context(&self, fields: Metadata) {
        let mut scopes = self.scopes.lock().expect("scope stack poisoned");
        if let Some(scope) = scopes.last_mut() {
            scope.metadata.extend(fields);
        }
        // Nothing open: drop the fields. Attaching ad hoc context must never
        // fail the caller.
    }
}

fn generate_trace_id() -> String {
    loop {
        let id: u128 = rand::random();
        if id != 0 {
            return format!("{id:032x}");
        }
    }
}

fn generate_span_id() -> String {
    loop {
        let id: u64 = rand::random();
        if id != 0 {
            return format!("{id:016x}");
        }
    }
}
