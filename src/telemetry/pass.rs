//! Spans around one engine pass (an assignment batch, a health check, ...).

use tracing::Span;

/// Span for one pass over a household. `pass.decisions` is filled in by
/// [`record_pass_outcome`].
pub fn start_pass_span(operation: &str, household_id: &str) -> Span {
    tracing::info_span!(
        "chorewheel.pass",
        "pass.operation" = operation,
        "household.id" = household_id,
        "pass.decisions" = tracing::field::Empty,
    )
}

/// Record how many decisions the pass produced and log it inside the span.
pub fn record_pass_outcome(span: &Span, decisions: usize) {
    span.record("pass.decisions", decisions as u64);
    span.in_scope(|| {
        tracing::info!(decisions, "pass complete");
    });
}
