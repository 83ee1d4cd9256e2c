//! Submission validation.
//!
//! Three checks, always in this order:
//!
//! 1. PII scan over the whole serialised submission. A hit quarantines the
//!    submission and ends the pipeline; nothing later can override it.
//! 2. Provenance: every cited document must be well-formed and known.
//!    Failures are itemized and nothing is stored.
//! 3. Dedup: a unit with an accepted finding returns that finding again;
//!    otherwise a new accepted finding is written.

pub mod pii;
pub mod provenance;

pub use pii::{PiiCategory, PiiMatch};
pub use provenance::ProvenanceIndex;

use chrono::Utc;
use opentelemetry::KeyValue;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::{
    Citation, Finding, FindingId, FindingStatus, Submission, UnitType, ValidationOutcome,
};
use crate::store::Store;
use crate::telemetry::metrics;

/// Quorum is single-worker for now: an accepted finding counts as one vote.
const QUORUM_COUNT: u32 = 1;

/// One validation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    PiiScan,
    Provenance,
    Dedup,
}

impl Check {
    /// The only order checks ever run in.
    pub const PIPELINE: [Check; 3] = [Check::PiiScan, Check::Provenance, Check::Dedup];

    pub fn as_str(self) -> &'static str {
        match self {
            Check::PiiScan => "pii_scan",
            Check::Provenance => "provenance",
            Check::Dedup => "dedup",
        }
    }
}

enum Step {
    Continue,
    Done(ValidationOutcome),
}

pub struct Validator {
    provenance: ProvenanceIndex,
    store: Store,
}

impl Validator {
    pub fn new(provenance: ProvenanceIndex, store: Store) -> Self {
        Self { provenance, store }
    }

    /// Run the pipeline, persisting accepted and quarantined outcomes.
    pub async fn validate(&self, submission: &Submission) -> Result<ValidationOutcome> {
        let started = std::time::Instant::now();
        let unit_type = submission.result.unit_type().ok_or_else(|| {
            Error::InvalidArgument(format!(
                "submission for unit {} carries an unrecognized result payload",
                submission.unit_id
            ))
        })?;
        let text = serde_json::to_string(submission)?;

        for check in Check::PIPELINE {
            if let Step::Done(outcome) = self.run(check, submission, unit_type, &text).await? {
                metrics::record_duration("validate", started);
                return Ok(outcome);
            }
        }
        Err(Error::Other(format!(
            "validation of unit {} finished without a verdict",
            submission.unit_id
        )))
    }

    async fn run(
        &self,
        check: Check,
        submission: &Submission,
        unit_type: UnitType,
        text: &str,
    ) -> Result<Step> {
        match check {
            Check::PiiScan => self.pii_scan(submission, unit_type, text).await,
            Check::Provenance => Ok(self.provenance_check(submission)),
            Check::Dedup => self.dedup(submission, unit_type).await.map(Step::Done),
        }
    }

    async fn pii_scan(
        &self,
        submission: &Submission,
        unit_type: UnitType,
        text: &str,
    ) -> Result<Step> {
        let matches = pii::scan(text);
        if matches.is_empty() {
            return Ok(Step::Continue);
        }

        let errors = matches
            .iter()
            .map(|m| format!("pii detected: {} pattern matched", m.category))
            .collect();
        // Quarantined findings keep no citations; they may be malformed and
        // must not be able to block the write.
        let finding = new_finding(submission, unit_type, FindingStatus::Quarantined, true);
        let stored = self.store.store_finding(&finding).await?;

        warn!(
            unit_id = %submission.unit_id,
            worker_id = %submission.worker_id,
            finding_id = %stored.finding_id,
            matches = matches.len(),
            "submission quarantined"
        );
        count_submission("quarantined");
        Ok(Step::Done(ValidationOutcome::quarantined(
            stored.finding_id,
            errors,
        )))
    }

    fn provenance_check(&self, submission: &Submission) -> Step {
        let errors = self.provenance.check(&submission.result.cited_documents());
        if errors.is_empty() {
            return Step::Continue;
        }
        info!(
            unit_id = %submission.unit_id,
            errors = errors.len(),
            "submission rejected on provenance"
        );
        count_submission("rejected");
        Step::Done(ValidationOutcome::rejected(errors))
    }

    async fn dedup(&self, submission: &Submission, unit_type: UnitType) -> Result<ValidationOutcome> {
        if let Some(existing) = self
            .store
            .accepted_finding_for_unit(submission.unit_id.as_str())
            .await?
        {
            info!(unit_id = %submission.unit_id, finding_id = %existing, "resubmission of accepted unit");
            count_submission("duplicate");
            return Ok(ValidationOutcome::accepted(existing));
        }

        let mut finding = new_finding(submission, unit_type, FindingStatus::Accepted, false);
        finding.quorum_count = QUORUM_COUNT;
        finding.citations = submission
            .result
            .cited_documents()
            .iter()
            .map(|cited| Citation::new(&finding.finding_id, cited))
            .collect();

        // A concurrent submission may have won the unit's accepted slot.
        let stored = self.store.store_finding(&finding).await?;
        count_submission(if stored.created { "accepted" } else { "duplicate" });
        info!(unit_id = %submission.unit_id, finding_id = %stored.finding_id, created = stored.created, "submission accepted");
        Ok(ValidationOutcome::accepted(stored.finding_id))
    }
}

fn new_finding(
    submission: &Submission,
    unit_type: UnitType,
    status: FindingStatus,
    pii_detected: bool,
) -> Finding {
    let now = Utc::now();
    Finding {
        finding_id: FindingId::new(),
        unit_id: submission.unit_id.clone(),
        unit_type,
        worker_id: submission.worker_id.clone(),
        submitted_at: now,
        validated_at: Some(now),
        status,
        result: submission.result.clone(),
        quorum_count: 0,
        pii_detected,
        citations: Vec::new(),
    }
}

fn count_submission(outcome: &'static str) {
    metrics::submissions().add(1, &[KeyValue::new("outcome", outcome)]);
}
