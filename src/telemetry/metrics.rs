//! OTel instruments for the binary, all from the `"chorewheel"` meter.
//!
//! Backed by whatever `MeterProvider` is registered globally; a no-op
//! provider when telemetry runs without an endpoint.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("chorewheel")
}

/// Counter: tasks given an assignee.
/// Labels: `mode` ("single" | "batch").
pub fn assignments_made() -> Counter<u64> {
    meter()
        .u64_counter("chorewheel.assignments")
        .with_description("Tasks assigned to a member")
        .build()
}

/// Counter: overload alerts raised.
/// Labels: `severity`.
pub fn alerts_raised() -> Counter<u64> {
    meter()
        .u64_counter("chorewheel.alerts")
        .with_description("Overload alerts raised")
        .build()
}

/// Counter: delegation candidates suggested.
pub fn delegation_suggestions() -> Counter<u64> {
    meter()
        .u64_counter("chorewheel.delegation.suggestions")
        .with_description("Delegation candidates suggested")
        .build()
}

/// Histogram: wall time of one pass.
/// Labels: `operation`.
pub fn pass_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("chorewheel.pass.duration_ms")
        .with_description("Engine pass duration in milliseconds")
        .with_unit("ms")
        .build()
}
