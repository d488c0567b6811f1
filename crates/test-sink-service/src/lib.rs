//! The test results sink: instrumented serverless handlers.
//!
//! This crate assembles the instrumentation primitives from the companion
//! crates into a working service:
//!
//! - `feature-bucketing` - one randomized decision per feature per request,
//!   stable for the request's lifetime
//! - `request-observability` - guaranteed-close trace/span lifecycle,
//!   inbound `traceparent` continuation, pluggable concurrency strategies
//!
//! Two handlers are exposed: [`TestSinkService::create`] registers a test
//! run, and [`TestSinkService::record_results`] records its results. The
//! latter is where the two layers meet: a per-request feature flag decides
//! whether the handler's pair of independent side effects runs strictly in
//! sequence or concurrently.
//!
//! Storage is consumed through the [`storage`] collaborator traits; the
//! in-memory implementations back local runs and tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod handlers;
mod scope;

pub mod storage;

pub use config::ServiceConfig;
pub use error::{Result, ServiceError};
pub use handlers::TestSinkService;
pub use scope::{RequestScope, TracerDecisionRecorder, FEATURES, SEQUENTIAL_SIDE_EFFECTS};
