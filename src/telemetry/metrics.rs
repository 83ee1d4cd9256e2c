//! Metric instruments for the unit pipeline.
//!
//! Built from the globally registered `MeterProvider`; with no provider set
//! they are no-ops, so callers never need to check.

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, Meter};

use super::SERVICE_NAME;

fn meter() -> Meter {
    opentelemetry::global::meter(SERVICE_NAME)
}

/// Counter: units handed out by the generator.
/// Labels: `unit_type`.
pub fn units_generated() -> Counter<u64> {
    meter()
        .u64_counter("casework.units.generated")
        .with_description("Number of work units generated")
        .build()
}

/// Counter: unit lifecycle transitions.
/// Labels: `from`, `to`.
pub fn unit_state_transitions() -> Counter<u64> {
    meter()
        .u64_counter("casework.units.state_transitions")
        .with_description("Number of work unit state transitions")
        .build()
}

/// Counter: validated submissions.
/// Labels: `outcome` ("accepted" | "duplicate" | "quarantined" | "rejected").
pub fn submissions() -> Counter<u64> {
    meter()
        .u64_counter("casework.submissions")
        .with_description("Number of validated submissions by outcome")
        .build()
}

/// Counter: gap resolutions.
/// Labels: `result` ("primary" | "adjacent" | "missing").
pub fn gap_resolutions() -> Counter<u64> {
    meter()
        .u64_counter("casework.locator.resolutions")
        .with_description("Number of document gap resolutions by result")
        .build()
}

/// Counter: finding writes.
/// Labels: `status`, `created` ("true" | "false").
pub fn store_writes() -> Counter<u64> {
    meter()
        .u64_counter("casework.store.writes")
        .with_description("Number of finding writes")
        .build()
}

/// Histogram: operation duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("casework.operation.duration_ms")
        .with_description("Operation duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Record one `operation_duration_ms` sample since `started`.
pub(crate) fn record_duration(operation: &'static str, started: std::time::Instant) {
    operation_duration_ms().record(
        started.elapsed().as_secs_f64() * 1000.0,
        &[KeyValue::new("operation", operation)],
    );
}
