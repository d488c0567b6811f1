//! Decision recording collaborator.

/// Observes feature flag outcomes for analysis.
///
/// The recorder is invoked on **every** query of a decision, not only the
/// first, so a sink can count how often a decision was consulted.
///
/// Recording is best-effort telemetry: implementations must not propagate
/// failure to the caller. Anything that can go wrong internally should be
/// swallowed (and logged via `tracing::warn!` if desired) so that a broken
/// sink never affects flag correctness.
pub trait DecisionRecorder: Send + Sync {
    /// Records that `feature` was queried and resolved to `decision`.
    fn record(&self, feature: &str, decision: bool);
}

/// The default recorder: discards every decision.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl DecisionRecorder for NoopRecorder {
    fn record(&self, _feature: &str, _decision: bool) {}
}
