//! Per-request randomized A/B bucketing.
//!
//! A [`FeatureFlagRegistry`] owns a fixed set of declared feature names and
//! acts as a factory for per-request [`FeatureFlagContext`] instances. Each
//! context draws one random decision per declared feature at creation time
//! and returns that same decision for the rest of the request, no matter how
//! many times or where it is queried. Two contexts (two requests) are
//! independent and may disagree.
//!
//! The random source and the decision recorder are both injectable, which
//! keeps decisions deterministic in tests and lets production code report
//! every query to a telemetry sink.
//!
//! # Example
//!
//! ```
//! use feature_bucketing::FeatureFlagRegistry;
//!
//! let registry = FeatureFlagRegistry::new(["use_new_codepath"]);
//! let flags = registry.new_context();
//!
//! // Stable for the lifetime of this context.
//! let first = flags.decide("use_new_codepath");
//! assert_eq!(flags.decide("use_new_codepath"), first);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod recorder;
mod registry;

pub use context::FeatureFlagContext;
pub use recorder::{DecisionRecorder, NoopRecorder};
pub use registry::{DecisionSource, FeatureFlagConfig, FeatureFlagRegistry};
