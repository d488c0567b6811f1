//! Per-request memoized feature flag decisions.

use crate::recorder::DecisionRecorder;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Holds the frozen bucketing decisions for one request.
///
/// Created once per request via
/// [`FeatureFlagRegistry::new_context`](crate::FeatureFlagRegistry::new_context)
/// and dropped when the request completes. Nothing persists across requests.
pub struct FeatureFlagContext {
    decisions: HashMap<String, bool>,
    recorder: Arc<dyn DecisionRecorder>,
}

impl FeatureFlagContext {
    pub(crate) fn new(
        decisions: HashMap<String, bool>,
        recorder: Arc<dyn DecisionRecorder>,
    ) -> Self {
        Self {
            decisions,
            recorder,
        }
    }

    /// Returns the memoized decision for `feature`.
    ///
    /// The recorder fires on every call, with the same frozen decision each
    /// time, so a sink can count how often a decision was consulted.
    ///
    /// # Panics
    ///
    /// Panics if `feature` was not declared when the registry was built.
    /// Querying an undeclared feature is a programming error and aborts
    /// loudly rather than silently defaulting.
    pub fn decide(&self, feature: &str) -> bool {
        let decision = match self.decisions.get(feature) {
            Some(decision) => *decision,
            None => panic!("feature flag `{feature}` is not declared in this registry"),
        };

        self.recorder.record(feature, decision);
        decision
    }

    /// Whether `feature` was declared when the registry was built.
    pub fn is_declared(&self, feature: &str) -> bool {
        self.decisions.contains_key(feature)
    }
}

impl fmt::Debug for FeatureFlagContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureFlagContext")
            .field("decisions", &self.decisions)
            .finish_non_exhaustive()
    }
}
