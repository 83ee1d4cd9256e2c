//! Transport-facing facade over the generator, validator and store.
//!
//! A request handler only ever talks to [`Pipeline`]: it hands out units,
//! records assignments, and turns a submission into a validation outcome,
//! completing the unit in the generator once a finding is on record.

use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::generator::{Generator, GeneratorStatus};
use crate::locator::Locator;
use crate::model::{CoverageStats, Submission, UnitState, UnitType, ValidationOutcome, WorkUnit};
use crate::store::{StatusCounts, Store};
use crate::validator::{ProvenanceIndex, Validator};

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub generator: GeneratorStatus,
    pub findings: StatusCounts,
    pub coverage: Vec<CoverageStats>,
    /// Whether each unit type could be generated right now.
    pub next_unit_available: Vec<(UnitType, bool)>,
}

pub struct Pipeline {
    generator: Generator,
    validator: Validator,
    store: Store,
}

impl Pipeline {
    pub fn new(catalog: &Catalog, locator: Locator, store: Store) -> Self {
        let provenance = ProvenanceIndex::from_catalog(catalog);
        Self {
            generator: Generator::new(catalog, locator),
            validator: Validator::new(provenance, store.clone()),
            store,
        }
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn next_unit(&self, unit_type: UnitType) -> Result<WorkUnit> {
        self.generator.generate_unit(unit_type)
    }

    pub fn assign(&self, unit_id: &str, worker_id: &str) -> Result<()> {
        self.generator.mark_unit_assigned(unit_id, worker_id)
    }

    pub fn release(&self, unit_id: &str) -> Result<()> {
        self.generator.release_unit(unit_id)
    }

    pub async fn submit(&self, submission: Submission) -> Result<ValidationOutcome> {
        let unit_id = submission.unit_id.as_str();
        let expected = self.generator.unit_type_of(unit_id)?;
        if submission.result.unit_type() != Some(expected) {
            return Err(Error::InvalidArgument(format!(
                "unit {unit_id} is a {expected} unit but the result is not"
            )));
        }
        match self.generator.unit_state(unit_id)? {
            UnitState::Assigned => {}
            // A completed unit is settled: hand back its accepted finding,
            // and never validate into one after a quarantine.
            UnitState::Completed => {
                return match self.store.accepted_finding_for_unit(unit_id).await? {
                    Some(existing) => {
                        debug!(unit_id, finding_id = %existing, "unit already completed");
                        Ok(ValidationOutcome::accepted(existing))
                    }
                    None => Err(Error::InvalidState {
                        unit_id: unit_id.to_string(),
                        from: UnitState::Completed,
                        to: UnitState::Completed,
                    }),
                };
            }
            state => {
                return Err(Error::InvalidState {
                    unit_id: unit_id.to_string(),
                    from: state,
                    to: UnitState::Completed,
                });
            }
        }

        let outcome = self.validator.validate(&submission).await?;

        if outcome.is_recorded() {
            match self.generator.mark_unit_complete(unit_id) {
                Ok(()) => {}
                // A concurrent submission completed the unit first.
                Err(Error::InvalidState {
                    from: UnitState::Completed,
                    ..
                }) => debug!(unit_id, "unit already completed"),
                Err(e) => return Err(e),
            }
        }
        info!(
            unit_id,
            accepted = outcome.accepted,
            pii_detected = outcome.pii_detected,
            "submission processed"
        );
        Ok(outcome)
    }

    pub async fn status(&self) -> Result<PipelineStatus> {
        let mut coverage = Vec::with_capacity(UnitType::ALL.len());
        let mut next_unit_available = Vec::with_capacity(UnitType::ALL.len());
        for unit_type in UnitType::ALL {
            coverage.push(self.store.get_coverage(unit_type).await?);
            next_unit_available.push((unit_type, self.generator.has_available(unit_type)?));
        }
        Ok(PipelineStatus {
            generator: self.generator.get_status()?,
            findings: self.store.count_by_status().await?,
            coverage,
            next_unit_available,
        })
    }
}
