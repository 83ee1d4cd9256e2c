//! Claim pool backing `verify_finding` units.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::MEDIA_PARTITION;
use crate::catalog::ClaimRecord;
use crate::locator::Locator;
use crate::model::{
    Constraints, Difficulty, DocumentId, DocumentUrl, NON_RECOVERY_CLAUSE, Scaling, UnitId,
    UnitInput, UnitType, WorkUnit,
};

const PATH: u8 = 5;
const OPTIMAL_BATCH: &str = "1 claim";
const CONSTRAINTS: Constraints = Constraints {
    max_output_tokens: 2000,
    pii_filter: true,
    requires_quorum: false,
};

/// A claim with every cited document already located.
#[derive(Debug, Clone)]
struct ReadyClaim {
    claim_id: String,
    claim: String,
    cited: Vec<DocumentId>,
    urls: Vec<DocumentUrl>,
    source_verified: bool,
}

/// Claims in insertion order plus which ones are out on a unit or done.
#[derive(Debug, Default)]
pub(crate) struct ClaimPool {
    claims: Vec<ReadyClaim>,
    reserved: HashSet<usize>,
    completed: HashSet<usize>,
}

impl ClaimPool {
    pub(crate) fn new(records: &[ClaimRecord], locator: &Locator) -> Self {
        let claims = records
            .iter()
            .filter_map(|record| ready(record, locator))
            .collect();
        Self {
            claims,
            ..Self::default()
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.claims.len()
    }

    /// First claim that is neither reserved by a live unit nor completed.
    pub(crate) fn next_available(&self) -> Option<usize> {
        (0..self.claims.len()).find(|i| !self.reserved.contains(i) && !self.completed.contains(i))
    }

    pub(crate) fn reserve(&mut self, index: usize) {
        self.reserved.insert(index);
    }

    /// Completed claims never return to the pool.
    pub(crate) fn complete(&mut self, index: usize) {
        self.reserved.remove(&index);
        self.completed.insert(index);
    }

    pub(crate) fn release(&mut self, index: usize) {
        self.reserved.remove(&index);
    }

    pub(crate) fn build_unit(&self, index: usize, deadline: DateTime<Utc>) -> Option<WorkUnit> {
        let claim = self.claims.get(index)?;
        Some(WorkUnit {
            unit_id: UnitId::generate(UnitType::VerifyFinding),
            unit_type: UnitType::VerifyFinding,
            path: PATH,
            difficulty: Difficulty::Low,
            scaling: Scaling::Linear,
            optimal_batch: OPTIMAL_BATCH.to_string(),
            input: UnitInput::VerifyFinding {
                claim: claim.claim.clone(),
                cited_documents: claim.cited.clone(),
                document_urls: claim.urls.clone(),
                source_verified: claim.source_verified,
            },
            instructions: instructions(),
            constraints: CONSTRAINTS,
            deadline,
            source_verified: claim.source_verified,
        })
    }

    pub(crate) fn claim_id(&self, index: usize) -> Option<&str> {
        self.claims.get(index).map(|c| c.claim_id.as_str())
    }
}

fn ready(record: &ClaimRecord, locator: &Locator) -> Option<ReadyClaim> {
    if record.cited.is_empty() {
        warn!(claim_id = %record.claim_id, "claim cites no documents, leaving it out");
        return None;
    }

    let mut cited = Vec::with_capacity(record.cited.len());
    let mut urls = Vec::with_capacity(record.cited.len());
    for cite in &record.cited {
        let number = cite.document.number();
        let Some(partition) = cite
            .partition
            .or_else(|| locator.get_primary_partition(number))
        else {
            warn!(claim_id = %record.claim_id, document = %cite.document, "no partition for cited document, leaving claim out");
            return None;
        };
        if partition.get() == MEDIA_PARTITION {
            warn!(claim_id = %record.claim_id, document = %cite.document, "claim cites media partition, leaving it out");
            return None;
        }
        cited.push(cite.document);
        urls.push(locator.build_url(number, partition));
    }

    Some(ReadyClaim {
        claim_id: record.claim_id.clone(),
        claim: record.claim.trim().to_string(),
        cited,
        urls,
        source_verified: record.source_verified,
    })
}

fn instructions() -> String {
    format!(
        "Review the cited documents at the URLs in `input.document_urls`. Decide whether \
         they support the claim in `input.claim`, dispute it, or give insufficient evidence. \
         Return JSON with `unit_type` set to \"verify_finding\", `verdict` (verified, disputed \
         or insufficient_evidence), `reasoning`, and `citations` (objects with `document`, \
         optional `page`, optional `quote`). {NON_RECOVERY_CLAUSE}"
    )
}
