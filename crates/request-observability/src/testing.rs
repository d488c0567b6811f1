//! Test support: a [`Tracer`] that records every collaborator call.
//!
//! Used by this crate's own lifecycle tests and by downstream crates that
//! need to assert on trace/span ordering without a real backend.

use crate::propagation::PropagationContext;
use crate::tracer::{Metadata, SpanHandle, TraceHandle, Tracer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// One observed call against the [`RecordingTracer`].
#[derive(Debug, Clone, PartialEq)]
pub enum TracerCall {
    /// `start_trace` with the merged metadata and decoded propagation.
    StartTrace {
        /// The merged metadata bag the trace was opened with.
        metadata: Metadata,
        /// The inherited propagation identifiers, possibly empty.
        propagation: PropagationContext,
    },
    /// `finish_trace` for the given root span.
    FinishTrace {
        /// Identifier of the closed trace's root span.
        span_id: String,
    },
    /// `start_span` with the given metadata.
    StartSpan {
        /// The metadata bag the span was opened with.
        metadata: Metadata,
    },
    /// `finish_span` for the given span.
    FinishSpan {
        /// Identifier of the closed span.
        span_id: String,
    },
    /// `add_context` with the given fields.
    AddContext {
        /// The merged-in fields.
        fields: Metadata,
    },
}

/// Tracer double that captures calls in order, with deterministic
/// `trace-N`/`span-N` identifiers.
#[derive(Debug, Default, Clone)]
pub struct RecordingTracer {
    calls: Arc<Mutex<Vec<TracerCall>>>,
    next_id: Arc<AtomicU64>,
}

impl RecordingTracer {
    /// Creates an empty recording tracer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every observed call, in invocation order.
    pub fn calls(&self) -> Vec<TracerCall> {
        self.calls.lock().expect("call log poisoned").clone()
    }

    /// Count of `start_trace` + `start_span` calls.
    pub fn opened(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| {
                matches!(call, TracerCall::StartTrace { .. } | TracerCall::StartSpan { .. })
            })
            .count()
    }

    /// Count of `finish_trace` + `finish_span` calls.
    pub fn closed(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    TracerCall::FinishTrace { .. } | TracerCall::FinishSpan { .. }
                )
            })
            .count()
    }

    /// The `error` field attached via `add_context`, if any.
    pub fn attached_error(&self) -> Option<String> {
        self.calls().iter().find_map(|call| match call {
            TracerCall::AddContext { fields } => fields
                .get("error")
                .and_then(|value| value.as_str())
                .map(str::to_string),
            _ => None,
        })
    }

    fn record(&self, call: TracerCall) {
        self.calls.lock().expect("call log poisoned").push(call);
    }

    fn next(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Tracer for RecordingTracer {
    fn start_trace(&self, metadata: Metadata, propagation: PropagationContext) -> TraceHandle {
        let id = self.next();
        self.record(TracerCall::StartTrace {
            metadata,
            propagation: propagation.clone(),
        });
        let trace_id = propagation
            .trace_id
            .unwrap_or_else(|| format!("trace-{id}"));
        TraceHandle::new(trace_id, format!("span-{id}"))
    }

    fn finish_trace(&self, handle: TraceHandle) {
        self.record(TracerCall::FinishTrace {
            span_id: handle.span_id().to_string(),
        });
    }

    fn start_span(&self, metadata: Metadata) -> SpanHandle {
        let id = self.next();
        self.record(TracerCall::StartSpan { metadata });
        SpanHandle::new(format!("trace-{id}"), format!("span-{id}"))
    }

    fn finish_span(&self, handle: SpanHandle) {
        self.record(TracerCall::FinishSpan {
            span_id: handle.span_id().to_string(),
        });
    }

    fn add_context(&self, fields: Metadata) {
        self.record(TracerCall::AddContext { fields });
    }
}
