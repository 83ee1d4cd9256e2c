//! Work unit generation and the assignment state machine.
//!
//! One `Generator` owns every unit's lifecycle. Generation, assignment,
//! completion and release all take the same lock, so a unit can never be
//! handed to two workers.
//!
//! ```text
//! generated → assigned → completed
//!     └──────────┴──────→ released
//! ```

mod claim;
mod window;

pub use window::{MAX_BATCH, MIN_BATCH, WINDOW_DAYS};

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{Duration, Utc};
use opentelemetry::KeyValue;
use serde::Serialize;
use tracing::{debug, info};

use self::claim::ClaimPool;
use self::window::WindowPool;
use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::model::{DocumentId, UnitId, UnitState, UnitType, WorkUnit};
use crate::telemetry::{metrics, work};

/// Partition holding media files, which no unit type can analyse.
pub(crate) const MEDIA_PARTITION: u8 = 10;

/// Advisory deadline attached to every unit.
pub const DEADLINE_HOURS: i64 = 24;

/// Counts for coverage reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneratorStatus {
    pub total_claims: usize,
    pub total_relationships: usize,
    /// Units ever generated.
    pub generated: usize,
    /// Units currently assigned to a worker.
    pub assigned: usize,
    pub completed: usize,
    pub released: usize,
}

#[derive(Debug, Clone)]
enum Backing {
    Claim(usize),
    Window(Vec<DocumentId>),
}

#[derive(Debug)]
struct UnitRecord {
    unit_type: UnitType,
    state: UnitState,
    worker_id: Option<String>,
    backing: Backing,
}

#[derive(Debug)]
struct State {
    claims: ClaimPool,
    windows: WindowPool,
    units: HashMap<UnitId, UnitRecord>,
}

impl State {
    fn return_backing(&mut self, backing: &Backing, completed: bool) {
        match (backing, completed) {
            (Backing::Claim(index), true) => self.claims.complete(*index),
            (Backing::Claim(index), false) => self.claims.release(*index),
            // Window documents go back to the pool either way.
            (Backing::Window(docs), _) => self.windows.give_back(docs),
        }
    }

    fn transition(&mut self, unit_id: &str, to: UnitState) -> Result<&mut UnitRecord> {
        let record = self
            .units
            .get_mut(unit_id)
            .ok_or_else(|| Error::NotFound(format!("unit {unit_id}")))?;
        let from = record.state;
        if !from.can_transition_to(to) {
            return Err(Error::InvalidState {
                unit_id: unit_id.to_string(),
                from,
                to,
            });
        }
        record.state = to;

        let span = work::start_unit_span(record.unit_type, &UnitId::from(unit_id));
        work::record_state_transition(&span, from, to);
        metrics::unit_state_transitions().add(
            1,
            &[
                KeyValue::new("from", from.to_string()),
                KeyValue::new("to", to.to_string()),
            ],
        );
        Ok(record)
    }
}

pub struct Generator {
    locator: Locator,
    state: Mutex<State>,
}

impl Generator {
    /// Build both pools from the catalog, locating every document up front.
    pub fn new(catalog: &Catalog, locator: Locator) -> Self {
        let claims = ClaimPool::new(&catalog.claims, &locator);
        let windows = WindowPool::new(&catalog.relationships, &locator);
        info!(
            claims = claims.len(),
            references = windows.len(),
            "generator ready"
        );
        Self {
            locator,
            state: Mutex::new(State {
                claims,
                windows,
                units: HashMap::new(),
            }),
        }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state.lock().map_err(|e| Error::Other(e.to_string()))
    }

    /// Like [`generate_unit`](Self::generate_unit), for a type name from the wire.
    pub fn generate(&self, unit_type: &str) -> Result<WorkUnit> {
        self.generate_unit(unit_type.parse()?)
    }

    pub fn generate_unit(&self, unit_type: UnitType) -> Result<WorkUnit> {
        let started = std::time::Instant::now();
        let deadline = Utc::now() + Duration::hours(DEADLINE_HOURS);
        let mut state = self.lock()?;

        let (unit, backing) = match unit_type {
            UnitType::VerifyFinding => {
                let index = state.claims.next_available().ok_or_else(|| {
                    Error::NotAvailable("every claim is assigned or completed".to_string())
                })?;
                let unit = state
                    .claims
                    .build_unit(index, deadline)
                    .ok_or_else(|| Error::Other(format!("claim index {index} out of range")))?;
                state.claims.reserve(index);
                debug!(claim_id = ?state.claims.claim_id(index), unit_id = %unit.unit_id, "claim reserved");
                (unit, Backing::Claim(index))
            }
            UnitType::DecisionChain => {
                let batch = state.windows.select().ok_or_else(|| {
                    Error::NotAvailable(format!(
                        "no {WINDOW_DAYS}-day window has {MIN_BATCH} unassigned documents"
                    ))
                })?;
                let docs = batch.document_ids();
                state.windows.take(&docs);
                debug!(start = %batch.start, documents = docs.len(), "window reserved");
                (batch.into_unit(deadline), Backing::Window(docs))
            }
        };

        state.units.insert(
            unit.unit_id.clone(),
            UnitRecord {
                unit_type,
                state: UnitState::Generated,
                worker_id: None,
                backing,
            },
        );
        drop(state);

        info!(unit_id = %unit.unit_id, unit_type = %unit_type, "unit generated");
        metrics::units_generated().add(1, &[KeyValue::new("unit_type", unit_type.as_str())]);
        metrics::record_duration("generate_unit", started);
        Ok(unit)
    }

    /// Non-mutating probe: would `generate_unit(unit_type)` succeed right now?
    pub fn has_available(&self, unit_type: UnitType) -> Result<bool> {
        let state = self.lock()?;
        Ok(match unit_type {
            UnitType::VerifyFinding => state.claims.next_available().is_some(),
            UnitType::DecisionChain => state.windows.select().is_some(),
        })
    }

    pub fn mark_unit_assigned(&self, unit_id: &str, worker_id: &str) -> Result<()> {
        let mut state = self.lock()?;
        let record = state.transition(unit_id, UnitState::Assigned)?;
        record.worker_id = Some(worker_id.to_string());
        info!(unit_id, worker_id, "unit assigned");
        Ok(())
    }

    /// Finish an assigned unit and settle its backing resource.
    pub fn mark_unit_complete(&self, unit_id: &str) -> Result<()> {
        let mut state = self.lock()?;
        let backing = state.transition(unit_id, UnitState::Completed)?.backing.clone();
        state.return_backing(&backing, true);
        info!(unit_id, "unit completed");
        Ok(())
    }

    /// Give up a generated or assigned unit; its backing returns to the pool.
    pub fn release_unit(&self, unit_id: &str) -> Result<()> {
        let mut state = self.lock()?;
        let backing = state.transition(unit_id, UnitState::Released)?.backing.clone();
        state.return_backing(&backing, false);
        info!(unit_id, "unit released");
        Ok(())
    }

    pub fn unit_type_of(&self, unit_id: &str) -> Result<UnitType> {
        self.with_record(unit_id, |r| r.unit_type)
    }

    pub fn unit_state(&self, unit_id: &str) -> Result<UnitState> {
        self.with_record(unit_id, |r| r.state)
    }

    /// Worker holding the unit, if it was ever assigned.
    pub fn assigned_worker(&self, unit_id: &str) -> Result<Option<String>> {
        self.with_record(unit_id, |r| r.worker_id.clone())
    }

    fn with_record<T>(&self, unit_id: &str, f: impl FnOnce(&UnitRecord) -> T) -> Result<T> {
        let state = self.lock()?;
        state
            .units
            .get(unit_id)
            .map(f)
            .ok_or_else(|| Error::NotFound(format!("unit {unit_id}")))
    }

    pub fn get_status(&self) -> Result<GeneratorStatus> {
        let state = self.lock()?;
        let count = |s: UnitState| state.units.values().filter(|r| r.state == s).count();
        Ok(GeneratorStatus {
            total_claims: state.claims.len(),
            total_relationships: state.windows.len(),
            generated: state.units.len(),
            assigned: count(UnitState::Assigned),
            completed: count(UnitState::Completed),
            released: count(UnitState::Released),
        })
    }
}
