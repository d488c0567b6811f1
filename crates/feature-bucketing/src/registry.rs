//! Registry of declared features; factory for per-request contexts.

use crate::context::FeatureFlagContext;
use crate::recorder::{DecisionRecorder, NoopRecorder};
use std::fmt;
use std::sync::Arc;

/// Produces one binary bucketing outcome per call.
///
/// Pure and stateless from the registry's point of view; replaceable for
/// deterministic tests.
pub type DecisionSource = Box<dyn Fn() -> bool + Send + Sync>;

/// Configuration for a [`FeatureFlagRegistry`].
///
/// Defaults to a uniform ~50/50 random source and a no-op recorder.
pub struct FeatureFlagConfig {
    /// The random source consulted once per feature per context.
    pub decision_source: DecisionSource,
    /// The sink notified on every query of a decision.
    pub recorder: Arc<dyn DecisionRecorder>,
}

impl Default for FeatureFlagConfig {
    fn default() -> Self {
        Self {
            decision_source: Box::new(rand::random::<bool>),
            recorder: Arc::new(NoopRecorder),
        }
    }
}

impl FeatureFlagConfig {
    /// Replaces the random source.
    pub fn with_decision_source(mut self, source: DecisionSource) -> Self {
        self.decision_source = source;
        self
    }

    /// Replaces the decision recorder.
    pub fn with_recorder(mut self, recorder: Arc<dyn DecisionRecorder>) -> Self {
        self.recorder = recorder;
        self
    }
}

impl fmt::Debug for FeatureFlagConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureFlagConfig").finish_non_exhaustive()
    }
}

/// Owns the declared feature set, fixed at construction time.
///
/// Each call to [`new_context`](Self::new_context) produces an independent
/// per-request context; the registry itself holds no mutable state.
pub struct FeatureFlagRegistry {
    features: Vec<String>,
    config: FeatureFlagConfig,
}

impl FeatureFlagRegistry {
    /// Creates a registry with the default configuration.
    pub fn new<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_config(features, FeatureFlagConfig::default())
    }

    /// Creates a registry with an explicit configuration.
    pub fn with_config<I, S>(features: I, config: FeatureFlagConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            features: features.into_iter().map(Into::into).collect(),
            config,
        }
    }

    /// The declared feature names, in declaration order.
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Creates a fresh context for one request.
    ///
    /// The decision source is consulted exactly once per declared feature,
    /// in declaration order, and the outcomes are frozen into the returned
    /// context. Contexts do not influence each other.
    pub fn new_context(&self) -> FeatureFlagContext {
        let decisions = self
            .features
            .iter()
            .map(|feature| (feature.clone(), (self.config.decision_source)()))
            .collect();

        FeatureFlagContext::new(decisions, Arc::clone(&self.config.recorder))
    }
}

impl fmt::Debug for FeatureFlagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureFlagRegistry")
            .field("features", &self.features)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic source that alternates starting from `initial`.
    fn alternating(initial: bool) -> DecisionSource {
        let state = Mutex::new(initial);
        Box::new(move || {
            let mut state = state.lock().unwrap();
            let value = *state;
            *state = !value;
            value
        })
    }

    #[test]
    fn draws_once_per_feature_per_context() {
        let draws = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&draws);
        let config = FeatureFlagConfig::default().with_decision_source(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        }));

        let registry = FeatureFlagRegistry::with_config(["a", "b", "c"], config);
        let context = registry.new_context();
        assert_eq!(draws.load(Ordering::SeqCst), 3);

        for _ in 0..100 {
            context.decide("a");
            context.decide("b");
        }
        assert_eq!(draws.load(Ordering::SeqCst), 3, "queries must not re-draw");
    }

    #[test]
    fn contexts_are_independent() {
        let config =
            FeatureFlagConfig::default().with_decision_source(alternating(true));
        let registry = FeatureFlagRegistry::with_config(["a", "b"], config);

        let first = registry.new_context();
        let second = registry.new_context();

        // Each context re-draws from the shared source in declaration order.
        assert!(first.decide("a"));
        assert!(!first.decide("b"));
        assert!(second.decide("a"));
        assert!(!second.decide("b"));
    }

    #[test]
    fn default_source_is_roughly_uniform() {
        let registry = FeatureFlagRegistry::new(["some_feature"]);

        let positive = (0..10_000)
            .filter(|_| registry.new_context().decide("some_feature"))
            .count();

        assert!(
            (4_500..=5_500).contains(&positive),
            "expected ~50/50 split, got {positive} positives out of 10000"
        );
    }

    #[test]
    fn declaration_order_is_preserved() {
        let registry = FeatureFlagRegistry::new(["z", "a", "m"]);
        assert_eq!(registry.features(), &["z", "a", "m"]);
    }
}
