//! Test Sink Workspace - Integration tests for request-lifecycle instrumentation.
//!
//! This is a virtual package that provides workspace-level integration tests.
//! The actual functionality is provided by the workspace member crates:
//!
//! - `feature-bucketing`: Per-request randomized feature flag decisions
//! - `request-observability`: Trace/span lifecycle wrapper and trace context propagation
//! - `test-sink-service`: Instrumented Lambda handlers for the test results sink
