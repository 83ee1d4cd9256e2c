//! Span helpers for the unit lifecycle.

use tracing::Span;

use crate::model::{UnitId, UnitState, UnitType};

/// Span covering one unit's lifecycle step.
///
/// `unit.state` starts empty and is filled by [`record_state_transition`].
pub fn start_unit_span(unit_type: UnitType, unit_id: &UnitId) -> Span {
    tracing::info_span!(
        "unit.lifecycle",
        "unit.type" = %unit_type,
        "unit.id" = %unit_id,
        "unit.state" = tracing::field::Empty,
    )
}

/// Emit a transition event inside `span` and record the new state on it.
pub fn record_state_transition(span: &Span, from: UnitState, to: UnitState) {
    span.record("unit.state", tracing::field::display(to));
    span.in_scope(|| {
        tracing::info!(from = %from, to = %to, "state_transition");
    });
}
