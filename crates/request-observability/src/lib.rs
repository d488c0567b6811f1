//! Trace and span lifecycle instrumentation for request handlers.
//!
//! This crate wraps arbitrary asynchronous business logic in a distributed
//! trace and guarantees that every trace and span is closed on every exit
//! path - normal completion or failure - with the triggering error attached
//! as context before the close. The original failure always surfaces to the
//! caller unchanged.
//!
//! # Architecture
//!
//! The tracing backend sits behind the [`Tracer`] trait using a
//! **handle-based** discipline: `start_trace`/`start_span` return an opaque
//! handle which must be passed back to the matching finish call. (A
//! callback-based span API is the other discipline seen in the wild; the
//! handle form composes better with Rust futures, where the wrapped
//! operation is just an awaited value rather than a nested closure.)
//!
//! [`ObservabilityWrapper`] composes a `Tracer` with request-derived base
//! metadata and exposes the three operations handlers use:
//! [`with_trace`](ObservabilityWrapper::with_trace),
//! [`with_span`](ObservabilityWrapper::with_span) and
//! [`add_context`](ObservabilityWrapper::add_context).
//!
//! Inbound distributed-trace continuation is best-effort:
//! [`decode_traceparent`] is a total function that degrades to an empty
//! [`PropagationContext`] on absent or malformed input.
//!
//! # Example
//!
//! ```
//! use request_observability::{
//!     metadata, LoggingTracer, ObservabilityWrapper, PropagationContext,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), std::convert::Infallible> {
//! let observability = ObservabilityWrapper::new(
//!     Arc::new(LoggingTracer::new()),
//!     metadata(json!({ "service.name": "example" })),
//! );
//!
//! let result = observability
//!     .with_trace(
//!         metadata(json!({ "name": "handle_request" })),
//!         PropagationContext::empty(),
//!         || async { Ok::<_, std::convert::Infallible>(42) },
//!     )
//!     .await?;
//! assert_eq!(result, 42);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod logging;
mod propagation;
mod strategy;
mod tracer;
mod wrapper;

pub mod testing;

pub use logging::LoggingTracer;
pub use propagation::{decode_traceparent, PropagationContext};
pub use strategy::{run_all, ConcurrencyStrategy};
pub use tracer::{metadata, Metadata, SpanHandle, TraceHandle, Tracer};
pub use wrapper::ObservabilityWrapper;
